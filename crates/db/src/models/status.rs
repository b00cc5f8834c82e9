//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` / `*_kinds` database table.

use bullhorn_core::event::CallEventStatus;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Decode a raw status ID, when it matches a known variant.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Outbound channel of a campaign.
    ChannelKind {
        Sms = 1,
        Voice = 2,
        Whatsapp = 3,
    }
}

define_status_enum! {
    /// Campaign lifecycle status.
    CampaignStatus {
        Draft = 1,
        Scheduled = 2,
        Sending = 3,
        Completed = 4,
        Failed = 5,
    }
}

define_status_enum! {
    /// Per-recipient delivery status.
    RecipientStatus {
        Pending = 1,
        Sent = 2,
        Delivered = 3,
        Failed = 4,
    }
}

define_status_enum! {
    /// Call log lifecycle status.
    CallStatus {
        Initiated = 1,
        Ringing = 2,
        InProgress = 3,
        Completed = 4,
        Busy = 5,
        Failed = 6,
        NoAnswer = 7,
        Canceled = 8,
        MachineDetected = 9,
    }
}

impl RecipientStatus {
    /// Delivered and failed are terminal observations; a recipient never
    /// legitimately leaves either.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }
}

impl CallStatus {
    /// Statuses from which no further lifecycle transition is accepted.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::Busy
                | Self::Failed
                | Self::NoAnswer
                | Self::Canceled
                | Self::MachineDetected
        )
    }
}

impl From<CallEventStatus> for CallStatus {
    fn from(status: CallEventStatus) -> Self {
        match status {
            CallEventStatus::Initiated => Self::Initiated,
            CallEventStatus::Ringing => Self::Ringing,
            CallEventStatus::InProgress => Self::InProgress,
            CallEventStatus::Completed => Self::Completed,
            CallEventStatus::Busy => Self::Busy,
            CallEventStatus::Failed => Self::Failed,
            CallEventStatus::NoAnswer => Self::NoAnswer,
            CallEventStatus::Canceled => Self::Canceled,
        }
    }
}
