//! Core protocol types for lycan's wire format.
//!
//! Every type here travels on the wire as JSON. Messages are internally
//! tagged with a snake_case `type` field and use camelCase field names,
//! which is what browser clients expect.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A participant's identity, stable for the lifetime of one connection.
///
/// Serialized as a plain number (`#[serde(transparent)]`); when used as a
/// map key it becomes the number's decimal string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// The name of a room. Rooms are addressed by name, not by number.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Creates a room id from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the room name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The phase a room's game is in.
///
/// ```text
/// Waiting → Night → Day → Vote → Finished → Waiting → ...
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Waiting,
    Night,
    Day,
    Vote,
    Finished,
}

impl Phase {
    /// The phase that follows this one in the regular cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Waiting => Self::Night,
            Self::Night => Self::Day,
            Self::Day => Self::Vote,
            Self::Vote => Self::Finished,
            Self::Finished => Self::Waiting,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Waiting => "waiting",
            Self::Night => "night",
            Self::Day => "day",
            Self::Vote => "vote",
            Self::Finished => "finished",
        })
    }
}

// ---------------------------------------------------------------------------
// Roles and teams
// ---------------------------------------------------------------------------

/// Identifier of a dealable role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RoleId {
    Villager,
    Werewolf,
    Seer,
    Tanner,
}

impl RoleId {
    /// Every role, in the order quotas are listed and tokens are built.
    pub const ALL: [RoleId; 4] =
        [Self::Villager, Self::Werewolf, Self::Seer, Self::Tanner];
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Villager => "villager",
            Self::Werewolf => "werewolf",
            Self::Seer => "seer",
            Self::Tanner => "tanner",
        })
    }
}

/// The side a role plays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Villagers,
    Werewolves,
    Neutral,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Villagers => "villagers",
            Self::Werewolves => "werewolves",
            Self::Neutral => "neutral",
        })
    }
}

/// Host-declared number of each role to deal.
///
/// Always holds an entry for every [`RoleId`] once normalized; a quota
/// decoded from a client may be partial until [`RoleQuota::normalized`]
/// is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleQuota(BTreeMap<RoleId, u32>);

impl RoleQuota {
    /// A quota with every role set to zero.
    pub fn new() -> Self {
        Self(RoleId::ALL.into_iter().map(|role| (role, 0)).collect())
    }

    /// Builds a normalized quota from `(role, count)` pairs.
    pub fn from_counts(
        counts: impl IntoIterator<Item = (RoleId, u32)>,
    ) -> Self {
        Self(counts.into_iter().collect()).normalized()
    }

    /// Fills in a zero for every role the quota does not mention.
    pub fn normalized(mut self) -> Self {
        for role in RoleId::ALL {
            self.0.entry(role).or_insert(0);
        }
        self
    }

    /// Requested count for one role.
    pub fn count(&self, role: RoleId) -> u32 {
        self.0.get(&role).copied().unwrap_or(0)
    }

    /// Sets the requested count for one role.
    pub fn set(&mut self, role: RoleId, count: u32) {
        self.0.insert(role, count);
    }

    /// Total number of role tokens the quota asks for.
    pub fn total(&self) -> usize {
        self.0.values().map(|&n| n as usize).sum()
    }

    /// Iterates `(role, count)` in [`RoleId::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (RoleId, u32)> + '_ {
        self.0.iter().map(|(&role, &count)| (role, count))
    }
}

impl Default for RoleQuota {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// Public projection of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: UserId,
    pub user_name: String,
    pub is_host: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleId>,
}

impl Participant {
    /// The same participant with the role hidden.
    pub fn redacted(&self) -> Self {
        Self {
            role: None,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Voting
// ---------------------------------------------------------------------------

/// A ballot: a player or an explicit abstention.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum VoteChoice {
    Player { user_id: UserId },
    Abstain,
}

impl VoteChoice {
    /// The targeted player, if the ballot is not an abstention.
    pub fn target(&self) -> Option<UserId> {
        match self {
            Self::Player { user_id } => Some(*user_id),
            Self::Abstain => None,
        }
    }
}

/// Where a vote session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteStatus {
    Open,
    Revote,
    Resolved,
}

/// Number of ballots one choice received in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub choice: VoteChoice,
    pub votes: u32,
}

/// Outcome of one tallied round, kept in the session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRoundSummary {
    pub round: u32,
    pub counts: Vec<VoteCount>,
    pub top_choices: Vec<VoteChoice>,
    pub resolved: bool,
}

/// Snapshot of a vote session as clients see it.
///
/// `votes` holds one entry per eligible voter (`null` until they vote).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteState {
    pub round: u32,
    pub eligible_voters: Vec<UserId>,
    pub candidates: Vec<UserId>,
    pub votes: BTreeMap<UserId, Option<VoteChoice>>,
    pub status: VoteStatus,
    pub history: Vec<VoteRoundSummary>,
}

/// Which side won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Villagers,
    Werewolves,
    Neutral,
    None,
}

impl From<Team> for Winner {
    fn from(team: Team) -> Self {
        match team {
            Team::Villagers => Self::Villagers,
            Team::Werewolves => Self::Werewolves,
            Team::Neutral => Self::Neutral,
        }
    }
}

/// Why the game ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultReason {
    Execution,
    Abstain,
    NoResolution,
}

/// Final outcome of a game, produced once when the vote resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub winner_team: Winner,
    pub reason: ResultReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_role: Option<RoleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_team: Option<Team>,
}

impl GameResult {
    /// A result with nobody executed.
    pub fn without_execution(winner_team: Winner, reason: ResultReason) -> Self {
        Self {
            winner_team,
            reason,
            executed_user_id: None,
            executed_user_name: None,
            executed_role: None,
            executed_team: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Target of a night ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum NightTarget {
    Player { user_id: UserId },
    /// The dealt-but-unassigned roles.
    Graveyard,
}

/// First frame a client sends: which room to join and as whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "hello", rename_all = "camelCase")]
pub struct Hello {
    pub version: u32,
    pub room: RoomId,
    #[serde(default)]
    pub user_name: String,
}

/// Commands a joined client can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    /// Host only: replace the role quota.
    UpdateRoleConfig { role_config: RoleQuota },
    /// Host only: move the room to another phase.
    ChangePhase { phase: Phase },
    /// Cast (or replace) this round's ballot.
    CastVote { choice: VoteChoice },
    /// Use this night's ability, or acknowledge if the role has none.
    NightAction {
        #[serde(default)]
        target: Option<NightTarget>,
    },
    /// Chat text, broadcast to the room.
    Message { message: String },
    /// Keepalive.
    Ping,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// A system message: either a bare notice or the initial state sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMessage {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_host: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<Participant>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_config: Option<RoleQuota>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_start_game: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_state: Option<VoteState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GameResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleId>,
}

impl SystemMessage {
    /// A notice carrying only text.
    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Messages the room sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Join {
        user_id: UserId,
        user_name: String,
        participants: Vec<Participant>,
    },
    Leave {
        user_id: UserId,
        user_name: String,
        participants: Vec<Participant>,
    },
    System(SystemMessage),
    RoleConfigUpdate {
        role_config: RoleQuota,
        can_start_game: bool,
    },
    PhaseChange {
        phase: Phase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<GameResult>,
    },
    /// Private: the recipient's dealt role.
    RoleAssigned { role: RoleId },
    Vote { vote_state: VoteState },
    /// Private: the recipient's night action was recorded.
    Action { completed: bool, remaining: usize },
    /// Chat. When `private` is set only `recipient_id` receives it.
    Message {
        user_id: UserId,
        user_name: String,
        message: String,
        #[serde(default)]
        private: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recipient_id: Option<UserId>,
    },
}

impl ServerMessage {
    /// For private messages, the only allowed recipient (`None` inside
    /// means nobody). `None` for public messages.
    pub fn private_recipient(&self) -> Option<Option<UserId>> {
        match self {
            Self::Message {
                private: true,
                recipient_id,
                ..
            } => Some(*recipient_id),
            _ => None,
        }
    }
}

/// Top-level outbound frame: a message plus its send time.
///
/// ```json
/// { "type": "phase_change", "phase": "day", "timestamp": 1700000000000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    #[serde(flatten)]
    pub message: ServerMessage,
}

impl Envelope {
    /// Wraps a message with the current wall-clock time.
    pub fn now(message: ServerMessage) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self { timestamp, message }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! JSON shape tests. Browser clients switch on these exact field
    //! names, so a serde attribute slip is a protocol break.

    use super::*;
    use serde_json::json;

    fn uid(id: u64) -> UserId {
        UserId(id)
    }

    #[test]
    fn test_user_id_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&uid(42)).unwrap(), "42");
        assert_eq!(uid(7).to_string(), "U-7");
    }

    #[test]
    fn test_phase_next_cycles_back_to_waiting() {
        let mut phase = Phase::Waiting;
        let mut seen = Vec::new();
        for _ in 0..5 {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                Phase::Night,
                Phase::Day,
                Phase::Vote,
                Phase::Finished,
                Phase::Waiting
            ]
        );
    }

    #[test]
    fn test_role_quota_normalized_fills_missing_roles() {
        let quota: RoleQuota =
            serde_json::from_value(json!({ "werewolf": 2 })).unwrap();
        let quota = quota.normalized();
        assert_eq!(quota.count(RoleId::Werewolf), 2);
        assert_eq!(quota.count(RoleId::Villager), 0);
        assert_eq!(quota.iter().count(), RoleId::ALL.len());
        assert_eq!(quota.total(), 2);
    }

    #[test]
    fn test_role_quota_serializes_as_role_map() {
        let quota = RoleQuota::from_counts([
            (RoleId::Villager, 3),
            (RoleId::Werewolf, 1),
        ]);
        let value = serde_json::to_value(&quota).unwrap();
        assert_eq!(
            value,
            json!({ "villager": 3, "werewolf": 1, "seer": 0, "tanner": 0 })
        );
    }

    #[test]
    fn test_role_quota_rejects_negative_counts() {
        let result: Result<RoleQuota, _> =
            serde_json::from_value(json!({ "villager": -1 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_hello_json_format() {
        let hello: Hello = serde_json::from_value(json!({
            "type": "hello", "version": 1, "room": "den", "userName": "ann"
        }))
        .unwrap();
        assert_eq!(hello.room, RoomId::new("den"));
        assert_eq!(hello.user_name, "ann");
    }

    #[test]
    fn test_client_command_cast_vote_player_json_format() {
        let cmd: ClientCommand = serde_json::from_value(json!({
            "type": "cast_vote",
            "choice": { "type": "player", "userId": 3 }
        }))
        .unwrap();
        assert_eq!(
            cmd,
            ClientCommand::CastVote {
                choice: VoteChoice::Player { user_id: uid(3) }
            }
        );
    }

    #[test]
    fn test_client_command_night_action_without_target() {
        let cmd: ClientCommand =
            serde_json::from_value(json!({ "type": "night_action" })).unwrap();
        assert_eq!(cmd, ClientCommand::NightAction { target: None });

        let cmd: ClientCommand = serde_json::from_value(json!({
            "type": "night_action", "target": { "type": "graveyard" }
        }))
        .unwrap();
        assert_eq!(
            cmd,
            ClientCommand::NightAction {
                target: Some(NightTarget::Graveyard)
            }
        );
    }

    #[test]
    fn test_client_command_unknown_type_returns_error() {
        let result: Result<ClientCommand, _> =
            serde_json::from_value(json!({ "type": "fly_to_moon" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_envelope_flattens_message_with_timestamp() {
        let envelope = Envelope {
            timestamp: 1234,
            message: ServerMessage::PhaseChange {
                phase: Phase::Day,
                result: None,
            },
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({ "type": "phase_change", "phase": "day", "timestamp": 1234 })
        );
    }

    #[test]
    fn test_envelope_decodes_back_from_flat_json() {
        let value = json!({
            "type": "action", "completed": true, "remaining": 2,
            "timestamp": 99
        });
        let envelope: Envelope = serde_json::from_value(value).unwrap();
        assert_eq!(envelope.timestamp, 99);
        assert_eq!(
            envelope.message,
            ServerMessage::Action {
                completed: true,
                remaining: 2
            }
        );
    }

    #[test]
    fn test_envelope_now_stamps_wall_clock() {
        let envelope = Envelope::now(ServerMessage::RoleAssigned {
            role: RoleId::Seer,
        });
        // 2020-09-13 or later.
        assert!(envelope.timestamp > 1_600_000_000_000);
    }

    #[test]
    fn test_system_notice_omits_sync_fields() {
        let msg = ServerMessage::System(SystemMessage::notice("nope"));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({ "type": "system", "message": "nope" }));
    }

    #[test]
    fn test_private_message_reports_recipient() {
        let msg = ServerMessage::Message {
            user_id: uid(0),
            user_name: "system".into(),
            message: "psst".into(),
            private: true,
            recipient_id: Some(uid(4)),
        };
        assert_eq!(msg.private_recipient(), Some(Some(uid(4))));

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["private"], true);
        assert_eq!(value["recipientId"], 4);

        let public = ServerMessage::RoleConfigUpdate {
            role_config: RoleQuota::new(),
            can_start_game: false,
        };
        assert_eq!(public.private_recipient(), None);
    }

    #[test]
    fn test_vote_state_votes_keyed_by_user_id_string() {
        let mut votes = BTreeMap::new();
        votes.insert(uid(1), Some(VoteChoice::Abstain));
        votes.insert(uid(2), None);
        let state = VoteState {
            round: 1,
            eligible_voters: vec![uid(1), uid(2)],
            candidates: vec![uid(1), uid(2)],
            votes,
            status: VoteStatus::Open,
            history: vec![],
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["votes"]["1"], json!({ "type": "abstain" }));
        assert!(value["votes"]["2"].is_null());
        assert_eq!(value["eligibleVoters"], json!([1, 2]));

        let decoded: VoteState = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_game_result_execution_json_format() {
        let result = GameResult {
            winner_team: Winner::Villagers,
            reason: ResultReason::Execution,
            executed_user_id: Some(uid(5)),
            executed_user_name: Some("eve".into()),
            executed_role: Some(RoleId::Werewolf),
            executed_team: Some(Team::Werewolves),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "winnerTeam": "villagers",
                "reason": "execution",
                "executedUserId": 5,
                "executedUserName": "eve",
                "executedRole": "werewolf",
                "executedTeam": "werewolves"
            })
        );
    }

    #[test]
    fn test_participant_redacted_hides_role() {
        let p = Participant {
            user_id: uid(1),
            user_name: "ann".into(),
            is_host: true,
            role: Some(RoleId::Werewolf),
        };
        let value = serde_json::to_value(p.redacted()).unwrap();
        assert_eq!(
            value,
            json!({ "userId": 1, "userName": "ann", "isHost": true })
        );
    }
}
