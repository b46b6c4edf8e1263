use serde_json::json;

use crate::model::game_event::GameEvent;

/// Style calibration for the narrative stage.
const NARRATIVE_STYLE_EXAMPLE: &str = "---\n\
EXAMPLE ANALYSIS: {\"sentiment\": \"positive\", \"key_action\": \"pass execution\"}\n\
EXAMPLE NARRATIVE (Neutral): The effective pass opened up space in the midfield.\n\
---\n";

/// Builds the prompts sent to the model.
/// Only formats text: no parsing, no networking.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Stage 1: ask for a JSON analysis of a single event.
    pub fn analysis(event: &GameEvent) -> String {
        let mut prompt = String::new();

        prompt.push_str("TASK: Analyze the following soccer event data and output a single JSON object.\n\n");

        prompt.push_str("DATA:\n");
        prompt.push_str(&format!("Event Type: {}\n", event.event_type.label()));
        prompt.push_str(&format!("Primary Player: {}\n", event.primary_player));
        prompt.push_str(&format!("Contextual Motion Insight: {}\n\n", event.motion_context));

        prompt.push_str(
            "OUTPUT SCHEMA: { \"sentiment\": \"positive\" | \"negative\" | \"neutral\", \
\"key_action\": string, \"justification\": string }\n\
Use exactly these three keys and nothing else.\n",
        );

        prompt
    }

    /// Stage 2: restyle the analysis as a two-sentence narrative.
    pub fn narrative(analysis_json: &str, tone: &str, focus_player: &str) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "You are a world-class sports commentator. Your analysis MUST be written with a {} tone \
and focused ONLY on the actions of {}.\n\n",
            tone, focus_player
        ));

        prompt.push_str("CONTEXTUAL ANALYSIS (JSON): ");
        prompt.push_str(analysis_json);
        prompt.push_str("\n\n");

        prompt.push_str(NARRATIVE_STYLE_EXAMPLE);
        prompt.push('\n');

        prompt.push_str(
            "TASK: Using the JSON analysis provided above, generate a two-sentence narrative \
summary with the requested tone.\n",
        );

        prompt
    }

    /// Single-stage report over a whole batch of events.
    pub fn match_report(events: &[GameEvent], tone: &str) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "You are a world-class sports commentator writing a match report in a {} tone.\n\n",
            tone
        ));

        push_event_list(&mut prompt, events);

        prompt.push_str(
            "OUTPUT FORMAT:\n\
Return a single JSON object with exactly these keys:\n\
- \"summary\": a three-paragraph narrative of the match.\n\
- \"key_moments\": an array of exactly 3 integers, each the ID of an event listed above.\n\n\
RULES:\n\
- Output raw JSON only. Do NOT wrap it in markdown or ``` code fences.\n\
- Do NOT use the keys \"justification\" or \"key_action\".\n\
- key_moments must contain plain integers, not strings like \"ID_300\".\n",
        );

        prompt
    }

    /// In-depth prompt for a goal with build-up and tracking data.
    pub fn goal_build_up(event: &GameEvent) -> String {
        let mut prompt = String::new();

        prompt.push_str(
            "Analyze the following goal event and its build-up. Provide an in-depth analysis of \
how the goal was scored, including who passed the ball, whether defenders were near the \
scorer, how many passes were in the build-up, and whether the scorer passed through defenders.\n\n",
        );

        prompt.push_str("GOAL EVENT:\n");
        let goal = json!({
            "id": event.id,
            "time_min": event.time_min,
            "primary_player": event.primary_player,
            "team": event.team,
            "motion_context": event.motion_context,
        });
        push_pretty_json(&mut prompt, &goal);

        prompt.push_str("\nBUILD-UP (most recent first):\n");
        for sub in event.build_up_events.iter().rev() {
            if let Ok(line) = serde_json::to_string(sub) {
                prompt.push_str(&line);
                prompt.push('\n');
            }
        }

        let tracking = &event.tracking;
        if tracking.has_tracking {
            prompt.push_str("\nTRACKING SUMMARY:\n");
            let summary = json!({
                "attacker_x": tracking.attacker_x,
                "attacker_y": tracking.attacker_y,
                "defender_x": tracking.defender_x,
                "defender_y": tracking.defender_y,
                "teammates_count": tracking.teammates.len(),
                "opponents_count": tracking.opponents.len(),
            });
            push_pretty_json(&mut prompt, &summary);
        }

        prompt.push_str(
            "\nPlease return a JSON object with these fields: 'summary', 'pass_sequence', \
'pressure_assessment', 'key_players', 'recommendations'. Keep answers factual and reference \
the events and tracking data provided.\n",
        );

        prompt
    }
}

fn push_event_list(prompt: &mut String, events: &[GameEvent]) {
    prompt.push_str("MATCH EVENTS:\n");
    for event in events {
        prompt.push_str(&format!(
            "- ID {} | {}' | {} | {} ({}) | {}\n",
            event.id,
            event.time_min,
            event.event_type.label(),
            event.primary_player,
            event.team,
            event.motion_context
        ));
    }
    prompt.push('\n');
}

fn push_pretty_json(prompt: &mut String, value: &serde_json::Value) {
    if let Ok(text) = serde_json::to_string_pretty(value) {
        prompt.push_str(&text);
        prompt.push('\n');
    }
}
