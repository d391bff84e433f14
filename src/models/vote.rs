use serde::{Deserialize, Deserializer, Serialize};

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct VoteRecord {
    /// Project the topic belongs to
    pub project_name: String,
    /// Topic identifier inside the project
    pub topic: String,
    /// Number of votes collected so far
    pub vote_count: u64,
    /// Unix timestamp (seconds) of the most recent vote
    #[serde(deserialize_with = "deserialize_unix_seconds")]
    pub last_vote: i64,
    /// Whether the owner hid this topic from the default view
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct VotesResponse {
    pub votes: Vec<VoteRecord>,
    #[serde(default, deserialize_with = "deserialize_null_as_empty")]
    pub single_voting_projects: Vec<String>,
}

// The backend stores `str(time.time())`, so the timestamp shows up as an
// integer, a float or a numeric string depending on the record's age.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Integer(i64),
    Float(f64),
    Text(String),
}

fn deserialize_unix_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Integer(seconds) => Ok(seconds),
        RawTimestamp::Float(seconds) => Ok(seconds.trunc() as i64),
        RawTimestamp::Text(text) => text
            .trim()
            .parse::<f64>()
            .map(|seconds| seconds.trunc() as i64)
            .map_err(|_| D::Error::custom(format!("invalid vote timestamp '{}'", text))),
    }
}

fn deserialize_null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_without_single_voting_projects() {
        let json = r#"{"votes": [{"project_name": "blog", "topic": "rust", "vote_count": 3, "last_vote": 1700000000}]}"#;
        let response: VotesResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.votes.len(), 1);
        assert!(response.single_voting_projects.is_empty());
        assert!(!response.votes[0].hidden);
    }

    #[test]
    fn test_decode_null_single_voting_projects() {
        let json = r#"{"votes": [], "single_voting_projects": null}"#;
        let response: VotesResponse = serde_json::from_str(json).unwrap();

        assert!(response.single_voting_projects.is_empty());
    }

    #[test]
    fn test_decode_timestamp_variants() {
        let json = r#"{"votes": [
            {"project_name": "a", "topic": "x", "vote_count": 1, "last_vote": "1700000000.734"},
            {"project_name": "a", "topic": "y", "vote_count": 1, "last_vote": 1700000001.2},
            {"project_name": "a", "topic": "z", "vote_count": 1, "last_vote": 1700000002, "hidden": true}
        ], "single_voting_projects": ["a"]}"#;
        let response: VotesResponse = serde_json::from_str(json).unwrap();

        let stamps: Vec<i64> = response.votes.iter().map(|v| v.last_vote).collect();
        assert_eq!(stamps, vec![1700000000, 1700000001, 1700000002]);
        assert!(response.votes[2].hidden);
        assert_eq!(response.single_voting_projects, vec!["a".to_string()]);
    }

    #[test]
    fn test_decode_rejects_garbage_timestamp() {
        let json = r#"{"project_name": "a", "topic": "x", "vote_count": 1, "last_vote": "soon"}"#;
        assert!(serde_json::from_str::<VoteRecord>(json).is_err());
    }
}
