use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::digest::ChunkBuffer;

#[derive(Debug, Error)]
pub enum GamesError {
    #[error("board game catalog `{path}` is unavailable: {detail}")]
    Unavailable { path: String, detail: String },
    #[error("board game catalog `{path}` is malformed: {detail}")]
    Malformed { path: String, detail: String },
}

/// One board game flattened out of the catalog export: a display name plus
/// string-valued properties (`Tags`, `NumPlayers`, `BGG Rating`, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Game {
    pub name: String,
    properties: BTreeMap<String, String>,
}

impl Game {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    fn property_or_unknown(&self, key: &str) -> &str {
        self.property(key).unwrap_or("unknown")
    }

    /// Whether this game supports exactly `bucket` players. `NumPlayers` is a
    /// comma-separated list of supported counts with `6+` as the top bucket.
    pub fn supports_players(&self, bucket: &str) -> bool {
        self.property("NumPlayers")
            .map(|counts| counts.split(',').any(|count| count.trim() == bucket))
            .unwrap_or(false)
    }

    fn summary_block(&self) -> String {
        format!(
            "**{}**: \n> **Tags**: {}\n> **Ideal Number of Players**: {}\n> **Play Time**: {}\n",
            self.name,
            self.property_or_unknown("Tags"),
            self.property_or_unknown("BestNumPlayer"),
            self.property_or_unknown("Time (min)"),
        )
    }
}

/// Board-game metadata loaded from a Notion database export. Keyed by
/// lowercased game name; lookups are case-insensitive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameCatalog {
    games: BTreeMap<String, Game>,
}

impl GameCatalog {
    pub fn load(path: &Path) -> Result<Self, GamesError> {
        let raw = fs::read_to_string(path).map_err(|error| GamesError::Unavailable {
            path: path.display().to_string(),
            detail: error.to_string(),
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|error| GamesError::Malformed {
            path: path.display().to_string(),
            detail: error.to_string(),
        })?;

        Ok(Self::from_export(&value))
    }

    /// Flattens the export. Entries without a readable name and properties of
    /// unknown type are skipped with a warning rather than failing the load.
    pub fn from_export(export: &Value) -> Self {
        let mut games = BTreeMap::new();
        let Some(results) = export.get("results").and_then(Value::as_array) else {
            warn!("board game export has no `results` array; catalog is empty");
            return Self { games };
        };

        for entry in results {
            let Some(properties) = entry.get("properties").and_then(Value::as_object) else {
                warn!("skipping board game entry without `properties`");
                continue;
            };
            let Some(name) = title_text(properties.get("Name")) else {
                warn!("skipping board game entry without a readable name");
                continue;
            };

            let mut flattened = BTreeMap::new();
            for (key, property) in properties {
                if key == "Name" {
                    continue;
                }
                match flatten_property(property) {
                    Some(value) => {
                        flattened.insert(key.clone(), value);
                    }
                    None => {
                        warn!(game = %name, property = %key, "skipping unsupported board game property");
                    }
                }
            }

            games.insert(name.to_ascii_lowercase(), Game { name, properties: flattened });
        }

        Self { games }
    }

    pub fn get(&self, name: &str) -> Option<&Game> {
        self.games.get(&name.trim().to_ascii_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// `games list`: every game's summary block, chunked at `limit`.
    pub fn render_list(&self, limit: usize) -> Vec<String> {
        let mut buffer = ChunkBuffer::new(limit);
        buffer.push_block("## Here are the available games:\n");
        for game in self.games.values() {
            buffer.push_block(&game.summary_block());
        }
        buffer.finish()
    }

    /// `games info <name>`: the full property card, or `None` for an unknown
    /// game.
    pub fn render_info(&self, name: &str) -> Option<String> {
        let game = self.get(name)?;
        let mut card = format!("## Here is the information for {}:\n", game.name);
        for (label, key) in [
            ("**Board Game Geek Rating** (out of 10)", "BGG Rating"),
            ("**Complexity** (out of 5)", "Complexity"),
            ("**Tags**", "Tags"),
            ("**Minimum Age**", "Ages"),
            ("**Possible Player Counts**", "NumPlayers"),
            ("**Ideal Number of Players**", "BestNumPlayer"),
            ("**Play Time**", "Time (min)"),
            ("**Description**", "Summary"),
            ("**Link to Board Game Geek**", "URL"),
        ] {
            card.push_str(&format!("{label}: {}\n", game.property_or_unknown(key)));
        }
        Some(card)
    }

    /// `games players <n>`: summary blocks for every game supporting that
    /// player count. Counts of six or more collapse into the `6+` bucket.
    pub fn render_players(&self, count: u32, limit: usize) -> Vec<String> {
        let bucket = if count >= 6 { "6+".to_owned() } else { count.to_string() };

        let mut buffer = ChunkBuffer::new(limit);
        buffer.push_block(&format!("## Here are the games that support {count} players:\n"));
        for game in self.games.values() {
            if game.supports_players(&bucket) {
                buffer.push_block(&game.summary_block());
            }
        }
        buffer.finish()
    }
}

fn title_text(property: Option<&Value>) -> Option<String> {
    let text = property?
        .get("title")?
        .as_array()?
        .first()?
        .get("plain_text")?
        .as_str()?
        .trim()
        .to_owned();
    (!text.is_empty()).then_some(text)
}

fn flatten_property(property: &Value) -> Option<String> {
    match property.get("type")?.as_str()? {
        "select" => Some(property.get("select")?.get("name")?.as_str()?.to_owned()),
        "multi_select" => {
            let names: Vec<&str> = property
                .get("multi_select")?
                .as_array()?
                .iter()
                .filter_map(|tag| tag.get("name").and_then(Value::as_str))
                .collect();
            Some(names.join(", "))
        }
        "number" => Some(property.get("number")?.as_number()?.to_string()),
        "url" => Some(property.get("url")?.as_str()?.to_owned()),
        "rich_text" => {
            let parts: Vec<&str> = property
                .get("rich_text")?
                .as_array()?
                .iter()
                .filter_map(|text| text.get("plain_text").and_then(Value::as_str))
                .collect();
            Some(parts.concat())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::GameCatalog;
    use crate::digest::MAX_CHUNK_LEN;

    fn export() -> serde_json::Value {
        json!({
            "results": [
                {
                    "properties": {
                        "Name": {"title": [{"plain_text": "Catan"}]},
                        "Tags": {"type": "multi_select", "multi_select": [
                            {"name": "strategy"}, {"name": "trading"}
                        ]},
                        "NumPlayers": {"type": "multi_select", "multi_select": [
                            {"name": "3"}, {"name": "4"}
                        ]},
                        "BestNumPlayer": {"type": "select", "select": {"name": "4"}},
                        "BGG Rating": {"type": "number", "number": 7.1},
                        "Time (min)": {"type": "number", "number": 90},
                        "URL": {"type": "url", "url": "https://boardgamegeek.com/catan"},
                        "Summary": {"type": "rich_text", "rich_text": [
                            {"plain_text": "Settle "}, {"plain_text": "the island."}
                        ]},
                        "Mystery": {"type": "files"}
                    }
                },
                {
                    "properties": {
                        "Name": {"title": [{"plain_text": "Werewolf"}]},
                        "NumPlayers": {"type": "multi_select", "multi_select": [
                            {"name": "6+"}
                        ]}
                    }
                },
                {
                    "properties": {
                        "Name": {"title": []}
                    }
                }
            ]
        })
    }

    #[test]
    fn flattens_every_supported_property_type() {
        let catalog = GameCatalog::from_export(&export());
        let game = catalog.get("catan").expect("catan");

        assert_eq!(game.property("Tags"), Some("strategy, trading"));
        assert_eq!(game.property("BestNumPlayer"), Some("4"));
        assert_eq!(game.property("BGG Rating"), Some("7.1"));
        assert_eq!(game.property("Time (min)"), Some("90"));
        assert_eq!(game.property("URL"), Some("https://boardgamegeek.com/catan"));
        assert_eq!(game.property("Summary"), Some("Settle the island."));
        assert_eq!(game.property("Mystery"), None);
    }

    #[test]
    fn entries_without_readable_names_are_skipped() {
        let catalog = GameCatalog::from_export(&export());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let catalog = GameCatalog::from_export(&export());
        assert!(catalog.get("  CATAN ").is_some());
        assert!(catalog.get("azul").is_none());
    }

    #[test]
    fn list_uses_each_games_own_properties() {
        let catalog = GameCatalog::from_export(&export());
        let chunks = catalog.render_list(MAX_CHUNK_LEN);

        let combined = chunks.concat();
        assert!(combined.contains("**Catan**"));
        assert!(combined.contains("> **Tags**: strategy, trading"));
        // Werewolf has no play time; its row must fall back, not borrow
        // another game's value.
        assert!(combined.contains("**Werewolf**"));
        assert!(combined.contains("> **Play Time**: unknown"));
    }

    #[test]
    fn info_card_contains_all_labels() {
        let catalog = GameCatalog::from_export(&export());
        let card = catalog.render_info("Catan").expect("card");

        assert!(card.contains("**Board Game Geek Rating** (out of 10): 7.1"));
        assert!(card.contains("**Description**: Settle the island."));
        assert!(card.contains("**Link to Board Game Geek**: https://boardgamegeek.com/catan"));
    }

    #[test]
    fn player_counts_of_six_or_more_collapse_to_top_bucket() {
        let catalog = GameCatalog::from_export(&export());

        let chunks = catalog.render_players(9, MAX_CHUNK_LEN);
        let combined = chunks.concat();
        assert!(combined.contains("support 9 players"));
        assert!(combined.contains("**Werewolf**"));
        assert!(!combined.contains("**Catan**"));
    }

    #[test]
    fn exact_token_match_avoids_substring_collisions() {
        let catalog = GameCatalog::from_export(&serde_json::json!({
            "results": [{
                "properties": {
                    "Name": {"title": [{"plain_text": "Big Table"}]},
                    "NumPlayers": {"type": "multi_select", "multi_select": [{"name": "12"}]}
                }
            }]
        }));

        let combined = catalog.render_players(1, MAX_CHUNK_LEN).concat();
        assert!(!combined.contains("**Big Table**"));
    }
}
