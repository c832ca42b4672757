//! Error types for game rule violations.
//!
//! Every variant is a rejection: the state is left untouched and the
//! caller tells the requester why. The Display text is what the client
//! reads in its notice.

use lycan_protocol::{Phase, RoleId, UserId};

/// A command the game rules refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// A host-only command from someone else.
    #[error("only the host can do that")]
    NotHost,

    /// The command is not valid in the current phase.
    #[error("not allowed during the {actual} phase (needs {expected})")]
    WrongPhase { expected: Phase, actual: Phase },

    /// The phase machine has no such edge.
    #[error("cannot change phase from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },

    /// No vote session is open.
    #[error("vote not in progress")]
    VoteNotInProgress,

    /// The voter may not vote this round.
    #[error("{0} is not eligible to vote this round")]
    NotEligible(UserId),

    /// Voting for, or using an ability on, oneself.
    #[error("cannot target self")]
    CannotTargetSelf,

    /// The ballot names someone who is not a candidate this round.
    #[error("{0} is not a valid candidate")]
    InvalidCandidate(UserId),

    /// A second night action in the same night.
    #[error("{0} already completed tonight's action")]
    AlreadyCompleted(UserId),

    /// The role's ability needs a target and none was given.
    #[error("the {0} ability needs a target")]
    TargetRequired(RoleId),

    /// A night target that is not in the room.
    #[error("{0} is not in this room")]
    UnknownTarget(UserId),

    /// The actor was never dealt a role.
    #[error("{0} has no role")]
    NoRole(UserId),

    /// The quota does not fit the room.
    #[error(
        "role quota does not fit: {total} roles for {participants} participants \
         plus {extra} extra slots, with at least one werewolf and one villager side role"
    )]
    ConfigInvalid {
        total: usize,
        participants: usize,
        extra: usize,
    },

    /// Fewer role tokens than participants.
    #[error("cannot deal {roles} roles to {participants} participants")]
    NotEnoughRoles { roles: usize, participants: usize },
}
