use std::collections::VecDeque;

use anyhow::{Context, Result};

use hostbridge::{
    Bridge, BridgeConfig, HostShape, LayoutTable, SkullDelivery, SkullOutcome, SkullPacketBuilder,
    SkullRequest, SkullState, WarmupReport,
};

use crate::config::ProbeConfig;
use crate::events::{ProbeEvent, SkullSummary};

/// One bridge booted against one reference host shape.
pub struct Probe {
    shape: HostShape,
    bridge: Bridge,
    config: ProbeConfig,
    pending_events: VecDeque<ProbeEvent>,
}

impl Probe {
    pub fn new(config: ProbeConfig) -> Result<Self> {
        let mut shape = HostShape::by_name(&config.shape).with_context(|| {
            format!(
                "unknown host shape {:?}, expected one of: {}",
                config.shape,
                HostShape::NAMES.join(", ")
            )
        })?;

        let mut pending_events = VecDeque::new();
        for member in &config.drop_members {
            let removed = member.apply(shape.host_mut());
            pending_events.push_back(ProbeEvent::MemberDropped {
                member: member.to_string(),
                removed,
            });
        }

        let mut bridge_config =
            BridgeConfig::builtin().context("built-in tables are inconsistent")?;
        if let Some(path) = &config.layouts {
            let overrides = LayoutTable::load(path)
                .with_context(|| format!("failed to load layouts from {}", path.display()))?;
            bridge_config = bridge_config.with_overrides(overrides);
        }
        if let Some(version) = &config.version_override {
            bridge_config = bridge_config.with_version_override(version.clone());
        }

        let bridge = Bridge::new(shape.runtime(), bridge_config);
        pending_events.push_back(ProbeEvent::Booted {
            shape: shape.name(),
            version: bridge.version().to_string(),
            package: bridge.package().map(ToString::to_string),
        });

        Ok(Self {
            shape,
            bridge,
            config,
            pending_events,
        })
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ProbeEvent> + '_ {
        self.pending_events.drain(..)
    }

    pub fn warm_up(&mut self) -> WarmupReport {
        let requests =
            SkullPacketBuilder::requests(self.config.texture.is_signed(), self.config.deliver);
        let report = self.bridge.warm_up(&requests);

        for (request, member) in &report.resolved {
            self.pending_events.push_back(ProbeEvent::Resolved {
                request: request.to_string(),
                member: member.clone(),
            });
        }
        for error in &report.failed {
            self.pending_events.push_back(ProbeEvent::Unresolved {
                request: error.request().to_string(),
                reason: error.to_string(),
            });
        }
        report
    }

    pub fn build_skull(&mut self) -> SkullOutcome {
        let mut request = SkullRequest::new(self.config.texture.clone());
        if self.config.deliver {
            let connection = self.shape.open_connection(&self.config.player);
            if self.config.closed_connection {
                HostShape::close_connection(&connection);
            }
            request = request.deliver_to(SkullDelivery::inventory(connection, self.config.slot));
        }

        let outcome = self.bridge.skulls().build(&request);
        let summary = match outcome.state() {
            SkullState::Sent => SkullSummary::Sent,
            SkullState::SendFailed(_) => SkullSummary::SendFailed,
            SkullState::Failed(error) if error.is_unsupported() => SkullSummary::Unsupported,
            SkullState::Failed(_) => SkullSummary::Failed,
            _ => SkullSummary::Built,
        };

        if summary == SkullSummary::Sent {
            if let Some(sent) = self.shape.packets().last() {
                self.pending_events.push_back(ProbeEvent::PacketSent {
                    player: sent.player,
                    bytes: sent.bytes.len(),
                });
            }
        }
        self.pending_events.push_back(ProbeEvent::SkullFinished {
            outcome: summary,
            detail: outcome
                .user_message()
                .unwrap_or_else(|| outcome.state().to_string()),
        });
        outcome
    }
}
