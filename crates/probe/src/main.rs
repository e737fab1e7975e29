mod config;
mod events;
mod probe;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use config::{MemberDrop, ProbeConfig};
use events::{ProbeEvent, SkullSummary};
use hostbridge::TextureValue;
use hostbridge::skull::UNSUPPORTED;
use probe::Probe;

#[derive(Parser)]
#[command(name = "bridge-probe")]
#[command(about = "Boots the host bridge against a reference host and builds a textured skull")]
struct Args {
    #[arg(
        short,
        long,
        default_value = "modern",
        help = "Host shape: legacy, modern or unversioned"
    )]
    shape: String,

    #[arg(long, help = "Host version to assume instead of the reported one")]
    version: Option<String>,

    #[arg(long, help = "TOML file with candidate layout overrides")]
    layouts: Option<PathBuf>,

    #[arg(long, conflicts_with = "skin_url", help = "Base64 texture value")]
    texture: Option<String>,

    #[arg(long, help = "Skin URL to wrap into a texture value")]
    skin_url: Option<String>,

    #[arg(long, help = "Signature for the texture value")]
    signature: Option<String>,

    #[arg(long, default_value = "probe")]
    player: String,

    #[arg(long, default_value_t = 36)]
    slot: i64,

    #[arg(long, help = "Send the skull to the player with a set-slot packet")]
    deliver: bool,

    #[arg(long, requires = "deliver", help = "Close the connection before sending")]
    closed_connection: bool,

    #[arg(
        long = "drop-member",
        value_name = "CLASS#MEMBER",
        help = "Remove a host member before booting"
    )]
    drop_members: Vec<MemberDrop>,
}

impl Args {
    fn texture(&self) -> Option<TextureValue> {
        let value = match (&self.texture, &self.skin_url) {
            (Some(value), _) => value.clone(),
            (None, Some(url)) => TextureValue::from_skin_url(url).value().to_owned(),
            (None, None) => return None,
        };
        Some(match &self.signature {
            Some(signature) => TextureValue::signed(value, signature.clone()),
            None => TextureValue::new(value),
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ProbeConfig {
        texture: args
            .texture()
            .unwrap_or_else(|| ProbeConfig::default().texture),
        shape: args.shape,
        version_override: args.version,
        layouts: args.layouts,
        player: args.player,
        slot: args.slot,
        deliver: args.deliver,
        closed_connection: args.closed_connection,
        drop_members: args.drop_members,
    };

    let mut probe = Probe::new(config)?;
    let report = probe.warm_up();
    let outcome = probe.build_skull();

    let mut summary = None;
    for event in probe.drain_events() {
        match event {
            ProbeEvent::Booted {
                shape,
                version,
                package,
            } => {
                log::info!(
                    "Booted against {} host {} ({})",
                    shape,
                    version,
                    package.as_deref().unwrap_or("unversioned")
                );
            }
            ProbeEvent::MemberDropped { member, removed } => {
                log::info!("Dropped {} ({} members)", member, removed);
            }
            ProbeEvent::Resolved { request, member } => {
                log::info!("{} -> {}", request, member);
            }
            ProbeEvent::Unresolved { request, reason } => {
                log::warn!("{} unresolved: {}", request, reason);
            }
            ProbeEvent::PacketSent { player, bytes } => {
                log::info!("Sent {} bytes to {}", bytes, player);
            }
            ProbeEvent::SkullFinished { outcome, detail } => {
                log::info!("Skull {}: {}", outcome.as_str(), detail);
                summary = Some(outcome);
            }
        }
    }

    println!(
        "{} of {} accessors resolved on {}",
        report.resolved.len(),
        report.resolved.len() + report.failed.len(),
        probe.bridge().version()
    );
    match summary {
        Some(SkullSummary::Unsupported) => println!("skull: {UNSUPPORTED}"),
        Some(summary) => println!("skull: {}", summary.as_str()),
        None => {}
    }
    if let Some(error) = outcome.error().filter(|e| !e.is_unsupported()) {
        println!("error: {error}");
    }

    Ok(())
}
