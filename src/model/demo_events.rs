use crate::model::game_event::{EventType, GameEvent, Tracking};

/// The built-in demo batch shown before any real match data is loaded.
pub fn demo_events() -> Vec<GameEvent> {
    vec![
        demo_event(
            1,
            EventType::Goal,
            88,
            "A. Smith",
            "J. Brown",
            "Home",
            "The defense was severely out of position due to a rapid tactical shift on the wing, leaving a massive gap in the center.",
        ),
        demo_event(
            2,
            EventType::Pass,
            45,
            "L. Messi",
            "J. Alba",
            "Away",
            "Primary player utilized a low-risk, high-reward diagonal trajectory, bypassing three defenders who were over-committed.",
        ),
        demo_event(
            3,
            EventType::Foul,
            12,
            "M. Jones",
            "R. Sterling",
            "Home",
            "Defensive player arrived late to the challenge with high velocity, failing to decelerate before contact.",
        ),
    ]
}

fn demo_event(
    id: u32,
    event_type: EventType,
    time_min: u32,
    primary_player: &str,
    secondary_player: &str,
    team: &str,
    motion_context: &str,
) -> GameEvent {
    GameEvent {
        id,
        event_type,
        time_min,
        primary_player: primary_player.into(),
        secondary_player: secondary_player.into(),
        team: team.into(),
        motion_context: motion_context.into(),
        home_team: None,
        away_team: None,
        tracking: Tracking::default(),
        build_up_events: Vec::new(),
    }
}
