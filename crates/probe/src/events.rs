#[derive(Debug, Clone)]
pub enum ProbeEvent {
    Booted {
        shape: &'static str,
        version: String,
        package: Option<String>,
    },
    MemberDropped {
        member: String,
        removed: usize,
    },
    Resolved {
        request: String,
        member: String,
    },
    Unresolved {
        request: String,
        reason: String,
    },
    SkullFinished {
        outcome: SkullSummary,
        detail: String,
    },
    PacketSent {
        player: String,
        bytes: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkullSummary {
    Built,
    Sent,
    Unsupported,
    Failed,
    SendFailed,
}

impl SkullSummary {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkullSummary::Built => "built",
            SkullSummary::Sent => "built and sent",
            SkullSummary::Unsupported => "unsupported",
            SkullSummary::Failed => "failed",
            SkullSummary::SendFailed => "built, send failed",
        }
    }
}
