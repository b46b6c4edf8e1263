use crate::model::game_event::GameEvent;
use crate::model::match_report::MatchReportResult;

pub type RequestId = u64;

pub enum EngineCommand {
    Narrate {
        request_id: RequestId,
        event: GameEvent,
        tone: String,
        focus_player: String,
    },
    MatchReport {
        request_id: RequestId,
        events: Vec<GameEvent>,
        tone: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineResponse {
    /// Err carries a display-ready message
    Narrative {
        request_id: RequestId,
        result: Result<String, String>,
    },

    MatchReport {
        request_id: RequestId,
        report: MatchReportResult,
    },
}

impl EngineResponse {
    pub fn request_id(&self) -> RequestId {
        match self {
            EngineResponse::Narrative { request_id, .. }
            | EngineResponse::MatchReport { request_id, .. } => *request_id,
        }
    }
}
