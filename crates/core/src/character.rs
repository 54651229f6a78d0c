//! Static agent identity.

use serde::{Deserialize, Serialize};

/// Who the agent is. Set at construction or generated once, then read-mostly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Character {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub occupation: String,
    #[serde(default)]
    pub hobbies: Vec<String>,
    #[serde(default)]
    pub music_taste: Vec<String>,
    #[serde(default)]
    pub sex: String,
}

impl Character {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.occupation.is_empty() && self.hobbies.is_empty()
    }

    /// JSON schema used when asking a model to invent a character.
    pub fn schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "The name of the character" },
                "age": { "type": "string", "description": "The age of the character" },
                "occupation": { "type": "string", "description": "The occupation of the character" },
                "hobbies": { "type": "array", "items": { "type": "string" }, "description": "The hobbies of the character" },
                "music_taste": { "type": "array", "items": { "type": "string" }, "description": "The music taste of the character" },
                "sex": { "type": "string", "description": "The sex of the character" }
            },
            "required": ["name", "age", "occupation", "hobbies", "music_taste", "sex"]
        })
    }

    /// Multi-line description used in prompts.
    pub fn describe(&self) -> String {
        format!(
            "Name: {}\nAge: {}\nOccupation: {}\nHobbies: {}\nMusic taste: {}\nSex: {}",
            self.name,
            self.age,
            self.occupation,
            self.hobbies.join(", "),
            self.music_taste.join(", "),
            self.sex,
        )
    }
}
