use thiserror::Error;

use crate::tui::geometry::Size;
use crate::tui::signal::SubscriptionId;
use crate::tui::tree::ControlId;

/// Broad class of a [`TreeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller passed a control or index the operation cannot accept.
    InvalidArgument,
    /// The control or subscription is not where the caller said it was.
    NotFound,
    /// The tree, or a buffer handed to it, disagrees with itself.
    InvalidState,
}

/// Errors raised by tree membership, attribute and render operations.
///
/// All of these are programming errors. They are reported before anything
/// is changed, so a failed call leaves the tree exactly as it was.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("unknown control {0:?}")]
    UnknownControl(ControlId),

    #[error("control {0:?} is not a container")]
    NotAContainer(ControlId),

    #[error("control {control:?} is already a member of {container:?}")]
    AlreadyMember {
        container: ControlId,
        control: ControlId,
    },

    #[error("control {control:?} already belongs to {parent:?}")]
    AlreadyParented {
        control: ControlId,
        parent: ControlId,
    },

    #[error("adding {control:?} to {container:?} would make it its own ancestor")]
    WouldCycle {
        container: ControlId,
        control: ControlId,
    },

    #[error("index {index} is out of range for {len} controls")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("control {0:?} does not hold a widget of the requested type")]
    WrongControlType(ControlId),

    #[error("control {control:?} is not a member of {container:?}")]
    NotAMember {
        container: ControlId,
        control: ControlId,
    },

    #[error("subscription {subscription:?} not found on {control:?}")]
    UnknownSubscription {
        control: ControlId,
        subscription: SubscriptionId,
    },

    #[error("control {0:?} is still attached and cannot be destroyed")]
    StillAttached(ControlId),

    #[error("control {control:?} names {recorded:?} as parent, but membership says {actual:?}")]
    InconsistentParent {
        control: ControlId,
        recorded: Option<ControlId>,
        actual: Option<ControlId>,
    },

    #[error("member {control:?} of {container:?} has no relay subscription")]
    MissingRelay {
        container: ControlId,
        control: ControlId,
    },

    #[error("control {0:?} carries a relay but has no parent")]
    StrayRelay(ControlId),

    #[error("buffer is {actual:?} but control {control:?} is {expected:?}")]
    BufferSize {
        control: ControlId,
        expected: Size,
        actual: Size,
    },
}

impl TreeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TreeError::UnknownControl(_)
            | TreeError::NotAContainer(_)
            | TreeError::AlreadyMember { .. }
            | TreeError::AlreadyParented { .. }
            | TreeError::WouldCycle { .. }
            | TreeError::IndexOutOfRange { .. }
            | TreeError::WrongControlType(_) => ErrorKind::InvalidArgument,
            TreeError::NotAMember { .. } | TreeError::UnknownSubscription { .. } => {
                ErrorKind::NotFound
            }
            TreeError::StillAttached(_)
            | TreeError::InconsistentParent { .. }
            | TreeError::MissingRelay { .. }
            | TreeError::StrayRelay(_)
            | TreeError::BufferSize { .. } => ErrorKind::InvalidState,
        }
    }
}
