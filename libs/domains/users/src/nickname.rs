//! Readable default nicknames such as `flying-dolphin-417`.

const VERBS: [&str; 5] = ["jumping", "running", "flying", "dancing", "swimming"];
const NOUNS: [&str; 5] = ["tiger", "eagle", "whale", "dolphin", "dragon"];

/// Random `{verb}-{noun}-{100..=999}`. Not unique on its own; callers check
/// availability and retry.
pub fn generate_nickname() -> String {
    let verb = VERBS[rand::random_range(0..VERBS.len())];
    let noun = NOUNS[rand::random_range(0..NOUNS.len())];
    let number: u16 = rand::random_range(100..=999);
    format!("{verb}-{noun}-{number}")
}
