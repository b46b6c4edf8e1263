pub mod analysis;
pub mod demo_events;
pub mod game_event;
pub mod llm_decode;
pub mod match_report;
