//! Conversational QA benchmark dataset
//!
//! Provides the typed in-memory model (samples, conversations, sessions,
//! turns, QA pairs, summaries) and the JSON loader that builds it from the
//! raw benchmark file. Raw records are irregular: session turn lists live
//! under `session_<n>` keys with `session_<n>_date_time` siblings, turns
//! may carry image captions instead of literal text, and most QA fields
//! are optional. The loader normalizes all of that, sanitizing every leaf
//! string on the way in.

use crate::text::sanitize;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Category code whose gold answer is the adversarial field rather than
/// the plain one.
pub const ADVERSARIAL_CATEGORY: u8 = 5;

/// One utterance within a session.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    /// Speaker name
    pub speaker: String,
    /// Stable dialogue-turn identifier
    pub dia_id: String,
    /// Utterance text, possibly synthesized from an image caption
    pub text: String,
}

/// A dated, ordered sub-conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Numeric session id from the `session_<n>` key
    pub session_id: u32,
    /// Timestamp string from the `session_<n>_date_time` sibling key
    pub date_time: String,
    /// Turns in dialogue order
    pub turns: Vec<Turn>,
}

/// A two-speaker conversation split into sessions.
///
/// Sessions are keyed by id; ids need not be contiguous. Sessions that
/// lack a date or end up with no turns never appear here.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub speaker_a: String,
    pub speaker_b: String,
    pub sessions: BTreeMap<u32, Session>,
}

/// One question/reference-answer unit.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionAnswer {
    pub question: String,
    /// Plain reference answer
    pub answer: Option<String>,
    /// Alternative gold answer for adversarial (category 5) questions
    pub adversarial_answer: Option<String>,
    /// Provenance references, format `session_key:turn_suffix`
    pub evidence: Vec<String>,
    /// Opaque category code; 5 denotes adversarial questions
    pub category: Option<u8>,
}

impl QuestionAnswer {
    /// The gold answer to score against: the adversarial answer for
    /// category 5 pairs, the plain answer otherwise.
    pub fn final_answer(&self) -> Option<&str> {
        if self.category == Some(ADVERSARIAL_CATEGORY) {
            self.adversarial_answer.as_deref()
        } else {
            self.answer.as_deref()
        }
    }
}

/// Event descriptions keyed by session, then speaker.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventSummary {
    pub events: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

/// One observation together with the dialogue evidence it came from.
#[derive(Debug, Clone, Serialize)]
pub struct ObservationEntry {
    pub text: String,
    pub evidence: String,
}

/// Observations keyed by session, then speaker.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Observation {
    pub observations: BTreeMap<String, BTreeMap<String, Vec<ObservationEntry>>>,
}

/// One full benchmark unit: a conversation with its QA pairs and
/// per-session context. Owns all nested data; immutable after load.
#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    /// 0-based input position as a string
    pub sample_id: String,
    pub qa: Vec<QuestionAnswer>,
    pub conversation: Conversation,
    pub event_summary: EventSummary,
    pub observation: Observation,
    /// Free-text summary per session key
    pub session_summary: BTreeMap<String, String>,
}

/// Basic corpus statistics over loaded samples.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStatistics {
    pub num_samples: usize,
    pub total_qa_pairs: usize,
    pub total_sessions: usize,
    pub total_turns: usize,
    pub qa_with_adversarial: usize,
}

impl DatasetStatistics {
    /// Compute statistics for a set of loaded samples.
    pub fn from_samples(samples: &[Sample]) -> Self {
        Self {
            num_samples: samples.len(),
            total_qa_pairs: samples.iter().map(|s| s.qa.len()).sum(),
            total_sessions: samples
                .iter()
                .map(|s| s.conversation.sessions.len())
                .sum(),
            total_turns: samples
                .iter()
                .map(|s| {
                    s.conversation
                        .sessions
                        .values()
                        .map(|sess| sess.turns.len())
                        .sum::<usize>()
                })
                .sum(),
            qa_with_adversarial: samples
                .iter()
                .map(|s| {
                    s.qa.iter()
                        .filter(|qa| qa.adversarial_answer.is_some())
                        .count()
                })
                .sum(),
        }
    }
}

impl std::fmt::Display for DatasetStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Dataset Statistics:")?;
        writeln!(f, "  Samples:            {}", self.num_samples)?;
        writeln!(f, "  QA pairs:           {}", self.total_qa_pairs)?;
        writeln!(f, "  Sessions:           {}", self.total_sessions)?;
        writeln!(f, "  Turns:              {}", self.total_turns)?;
        writeln!(f, "  QA w/ adversarial:  {}", self.qa_with_adversarial)?;
        Ok(())
    }
}

/// String form of a JSON value: the string itself for strings, the JSON
/// rendering otherwise (numbers, bools, nested values).
fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Load the benchmark from a JSON file whose root is a list of sample
/// records.
///
/// Any error inside a sample (missing required key, malformed QA pair)
/// fails the whole load with sample and pair index context; there is no
/// partial-sample recovery. Load-time statistics are logged, not
/// returned.
pub fn load_dataset(path: &Path) -> Result<Vec<Sample>> {
    if !path.exists() {
        anyhow::bail!("dataset file not found at {:?}", path);
    }

    tracing::info!("Loading dataset from {:?}", path);
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset file {:?}", path))?;
    let root: Value = serde_json::from_str(&raw)
        .with_context(|| format!("dataset file {:?} is not valid JSON", path))?;
    let records = root
        .as_array()
        .context("dataset root must be a JSON list of sample records")?;

    let mut samples = Vec::with_capacity(records.len());
    let mut qa_counts = Vec::with_capacity(records.len());
    let mut total_image_qa = 0usize;

    for (sample_idx, record) in records.iter().enumerate() {
        let sample = parse_sample(record, sample_idx).map_err(|e| {
            tracing::error!("error processing sample {}: {:#}", sample_idx, e);
            e
        })?;

        let image_qa = count_image_evidence_qa(record);
        tracing::info!(
            "sample {}: {} QA pairs, {} with image evidence",
            sample.sample_id,
            sample.qa.len(),
            image_qa
        );

        qa_counts.push(sample.qa.len());
        total_image_qa += image_qa;
        samples.push(sample);
    }

    log_load_stats(&qa_counts, total_image_qa);
    Ok(samples)
}

/// Log aggregate QA-count statistics for a completed load.
fn log_load_stats(qa_counts: &[usize], total_image_qa: usize) {
    if qa_counts.is_empty() {
        tracing::warn!("no samples loaded, skipping aggregate statistics");
        return;
    }

    let total_qa: usize = qa_counts.iter().sum();
    let min = qa_counts.iter().min().copied().unwrap_or(0);
    let max = qa_counts.iter().max().copied().unwrap_or(0);
    tracing::info!("total QA pairs: {}", total_qa);
    tracing::info!("total QA pairs with image evidence: {}", total_image_qa);
    tracing::info!(
        "QA pairs per sample: avg {:.2}, min {}, max {}",
        total_qa as f64 / qa_counts.len() as f64,
        min,
        max
    );
}

/// Count the QA pairs in a raw sample record whose evidence points at an
/// image-bearing turn. Purely observational; tolerates missing fields.
fn count_image_evidence_qa(record: &Value) -> usize {
    let qa_list = match record.get("qa").and_then(Value::as_array) {
        Some(list) => list,
        None => return 0,
    };
    let conversation = match record.get("conversation").and_then(Value::as_object) {
        Some(conv) => conv,
        None => return 0,
    };

    qa_list
        .iter()
        .filter(|qa| {
            let evidence: Vec<String> = qa
                .get("evidence")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(json_text).collect())
                .unwrap_or_default();
            evidence_has_image(&evidence, conversation)
        })
        .count()
}

/// Best-effort detection of image evidence for a QA pair.
///
/// For each evidence reference containing a colon, the substring after
/// the first colon is treated as a turn-id suffix. Every turn list in the
/// raw conversation record is scanned; a turn whose `dia_id` ends with
/// the suffix and which carries an `img_url` or `blip_caption` field
/// counts as a hit. Matching is approximate: a trailing-id collision in
/// another session also matches.
pub fn evidence_has_image(evidence: &[String], conversation: &Map<String, Value>) -> bool {
    for reference in evidence {
        let suffix = match reference.split_once(':') {
            Some((_, rest)) => rest,
            None => continue,
        };
        for value in conversation.values() {
            let turns = match value.as_array() {
                Some(turns) => turns,
                None => continue,
            };
            for turn in turns {
                let dia_id = turn.get("dia_id").and_then(Value::as_str).unwrap_or("");
                if dia_id.ends_with(suffix)
                    && (turn.get("img_url").is_some() || turn.get("blip_caption").is_some())
                {
                    return true;
                }
            }
        }
    }
    false
}

fn parse_sample(record: &Value, sample_idx: usize) -> Result<Sample> {
    let qa_raw = record
        .get("qa")
        .and_then(Value::as_array)
        .with_context(|| format!("sample {}: missing or non-list \"qa\" field", sample_idx))?;

    let mut qa = Vec::with_capacity(qa_raw.len());
    for (qa_idx, entry) in qa_raw.iter().enumerate() {
        let pair = parse_qa(entry)
            .map_err(|e| {
                tracing::error!(
                    "error in sample {}, QA pair {}: {:#}; QA data: {}",
                    sample_idx,
                    qa_idx,
                    e,
                    entry
                );
                e
            })
            .with_context(|| format!("sample {}, QA pair {}", sample_idx, qa_idx))?;
        qa.push(pair);
    }

    let conv_raw = record
        .get("conversation")
        .and_then(Value::as_object)
        .with_context(|| {
            format!(
                "sample {}: missing or non-object \"conversation\" field",
                sample_idx
            )
        })?;
    let conversation =
        parse_conversation(conv_raw).with_context(|| format!("sample {}", sample_idx))?;

    let events_raw = record
        .get("event_summary")
        .and_then(Value::as_object)
        .with_context(|| {
            format!(
                "sample {}: missing or non-object \"event_summary\" field",
                sample_idx
            )
        })?;
    let event_summary =
        parse_event_summary(events_raw).with_context(|| format!("sample {}", sample_idx))?;

    let observation_raw = record
        .get("observation")
        .and_then(Value::as_object)
        .with_context(|| {
            format!(
                "sample {}: missing or non-object \"observation\" field",
                sample_idx
            )
        })?;
    let observation =
        parse_observation(observation_raw).with_context(|| format!("sample {}", sample_idx))?;

    let session_summary = match record.get("session_summary") {
        Some(value) => {
            let obj = value.as_object().with_context(|| {
                format!("sample {}: \"session_summary\" must be an object", sample_idx)
            })?;
            obj.iter()
                .map(|(k, v)| (k.clone(), sanitize(&json_text(v))))
                .collect()
        }
        None => BTreeMap::new(),
    };

    Ok(Sample {
        sample_id: sanitize(&sample_idx.to_string()),
        qa,
        conversation,
        event_summary,
        observation,
        session_summary,
    })
}

fn parse_qa(entry: &Value) -> Result<QuestionAnswer> {
    let question = entry
        .get("question")
        .context("missing required \"question\" field")?;

    let answer = entry
        .get("answer")
        .filter(|v| !v.is_null())
        .map(|v| sanitize(&json_text(v)));
    let adversarial_answer = entry
        .get("adversarial_answer")
        .filter(|v| !v.is_null())
        .map(|v| sanitize(&json_text(v)));
    let evidence = entry
        .get("evidence")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|v| sanitize(&json_text(v))).collect())
        .unwrap_or_default();
    let category = entry
        .get("category")
        .and_then(Value::as_u64)
        .and_then(|c| u8::try_from(c).ok());

    Ok(QuestionAnswer {
        question: sanitize(&json_text(question)),
        answer,
        adversarial_answer,
        evidence,
        category,
    })
}

fn parse_conversation(conv: &Map<String, Value>) -> Result<Conversation> {
    let speaker_a = conv
        .get("speaker_a")
        .map(json_text)
        .context("conversation missing \"speaker_a\"")?;
    let speaker_b = conv
        .get("speaker_b")
        .map(json_text)
        .context("conversation missing \"speaker_b\"")?;

    let mut sessions = BTreeMap::new();
    for (key, value) in conv {
        let session_id = match key
            .strip_prefix("session_")
            .and_then(|rest| rest.parse::<u32>().ok())
        {
            Some(id) => id,
            None => continue,
        };
        let turns_raw = match value.as_array() {
            Some(turns) => turns,
            None => continue,
        };

        // A session without its date_time sibling is dropped outright.
        let date_time = conv
            .get(&format!("{}_date_time", key))
            .filter(|v| !v.is_null())
            .map(json_text)
            .unwrap_or_default();
        if date_time.is_empty() {
            continue;
        }

        let session = parse_session(turns_raw, session_id, &date_time)?;
        if !session.turns.is_empty() {
            sessions.insert(session_id, session);
        }
    }

    Ok(Conversation {
        speaker_a: sanitize(&speaker_a),
        speaker_b: sanitize(&speaker_b),
        sessions,
    })
}

fn parse_session(turns: &[Value], session_id: u32, date_time: &str) -> Result<Session> {
    let mut parsed = Vec::with_capacity(turns.len());
    for (turn_idx, turn) in turns.iter().enumerate() {
        let turn = parse_turn(turn)
            .with_context(|| format!("session {}, turn {}", session_id, turn_idx))?;
        parsed.push(turn);
    }
    Ok(Session {
        session_id,
        date_time: sanitize(date_time),
        turns: parsed,
    })
}

fn parse_turn(turn: &Value) -> Result<Turn> {
    let speaker = turn
        .get("speaker")
        .map(json_text)
        .context("turn missing \"speaker\"")?;
    let dia_id = turn
        .get("dia_id")
        .map(json_text)
        .context("turn missing \"dia_id\"")?;

    let mut text = turn
        .get("text")
        .filter(|v| !v.is_null())
        .map(json_text)
        .unwrap_or_default();

    // Turns carrying an image get its caption as pseudo-text, prefixed
    // before any literal text.
    if let (Some(_), Some(caption)) = (turn.get("img_url"), turn.get("blip_caption")) {
        let caption_text = format!("[Image: {}]", json_text(caption));
        text = if text.is_empty() {
            caption_text
        } else {
            format!("{} {}", caption_text, text)
        };
    }

    Ok(Turn {
        speaker: sanitize(&speaker),
        dia_id: sanitize(&dia_id),
        text: sanitize(&text),
    })
}

fn parse_event_summary(events: &Map<String, Value>) -> Result<EventSummary> {
    let mut parsed = BTreeMap::new();
    for (session_key, speakers) in events {
        let speakers_obj = speakers.as_object().with_context(|| {
            format!("event_summary[{:?}] must be an object", session_key)
        })?;
        let mut by_speaker = BTreeMap::new();
        for (speaker, list) in speakers_obj {
            let items = list.as_array().with_context(|| {
                format!("event_summary[{:?}][{:?}] must be a list", session_key, speaker)
            })?;
            let descriptions = items.iter().map(|v| sanitize(&json_text(v))).collect();
            by_speaker.insert(speaker.clone(), descriptions);
        }
        parsed.insert(session_key.clone(), by_speaker);
    }
    Ok(EventSummary { events: parsed })
}

fn parse_observation(observations: &Map<String, Value>) -> Result<Observation> {
    let mut parsed = BTreeMap::new();
    for (session_key, speakers) in observations {
        let speakers_obj = speakers.as_object().with_context(|| {
            format!("observation[{:?}] must be an object", session_key)
        })?;
        let mut by_speaker = BTreeMap::new();
        for (speaker, list) in speakers_obj {
            let items = list.as_array().with_context(|| {
                format!("observation[{:?}][{:?}] must be a list", session_key, speaker)
            })?;
            let mut entries = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                let pair = item.as_array().with_context(|| {
                    format!(
                        "observation[{:?}][{:?}][{}] must be a [text, evidence] pair",
                        session_key, speaker, idx
                    )
                })?;
                if pair.len() != 2 {
                    anyhow::bail!(
                        "observation[{:?}][{:?}][{}] has {} elements, expected 2",
                        session_key,
                        speaker,
                        idx,
                        pair.len()
                    );
                }
                entries.push(ObservationEntry {
                    text: sanitize(&json_text(&pair[0])),
                    evidence: sanitize(&json_text(&pair[1])),
                });
            }
            by_speaker.insert(speaker.clone(), entries);
        }
        parsed.insert(session_key.clone(), by_speaker);
    }
    Ok(Observation {
        observations: parsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn minimal_sample(qa: Value, conversation: Value) -> Value {
        json!({
            "qa": qa,
            "conversation": conversation,
            "event_summary": {},
            "observation": {},
        })
    }

    fn write_dataset(records: &Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", records).unwrap();
        file
    }

    #[test]
    fn test_load_preserves_order_and_assigns_ids() {
        let conv = json!({"speaker_a": "A", "speaker_b": "B"});
        let records = json!([
            minimal_sample(json!([]), conv.clone()),
            minimal_sample(json!([]), conv.clone()),
            minimal_sample(json!([]), conv),
        ]);
        let file = write_dataset(&records);

        let samples = load_dataset(file.path()).unwrap();
        assert_eq!(samples.len(), 3);
        let ids: Vec<_> = samples.iter().map(|s| s.sample_id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_dataset(Path::new("/nonexistent/data.json")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(load_dataset(file.path()).is_err());
    }

    #[test]
    fn test_session_without_date_time_is_dropped() {
        let conv = json!({
            "speaker_a": "A",
            "speaker_b": "B",
            "session_1": [{"speaker": "A", "dia_id": "D1:1", "text": "hi"}],
        });
        let conversation = parse_conversation(conv.as_object().unwrap()).unwrap();
        assert!(conversation.sessions.is_empty());
    }

    #[test]
    fn test_session_with_empty_turn_list_is_dropped() {
        let conv = json!({
            "speaker_a": "A",
            "speaker_b": "B",
            "session_2": [],
            "session_2_date_time": "1 May 2023",
        });
        let conversation = parse_conversation(conv.as_object().unwrap()).unwrap();
        assert!(conversation.sessions.is_empty());
    }

    #[test]
    fn test_session_discovery_keeps_dated_sessions() {
        let conv = json!({
            "speaker_a": "A",
            "speaker_b": "B",
            "session_1": [{"speaker": "A", "dia_id": "D1:1", "text": "hi"}],
            "session_1_date_time": "1 May 2023",
            "session_7": [{"speaker": "B", "dia_id": "D7:1", "text": "yo"}],
            "session_7_date_time": "9 May 2023",
        });
        let conversation = parse_conversation(conv.as_object().unwrap()).unwrap();
        let ids: Vec<_> = conversation.sessions.keys().copied().collect();
        assert_eq!(ids, vec![1, 7]);
        assert_eq!(conversation.sessions[&1].date_time, "1 May 2023");
    }

    #[test]
    fn test_turn_image_caption_prefixes_text() {
        let turn = json!({
            "speaker": "A",
            "dia_id": "D1",
            "img_url": "x",
            "blip_caption": "cat",
            "text": "look",
        });
        let parsed = parse_turn(&turn).unwrap();
        assert_eq!(parsed.text, "[Image: cat] look");
    }

    #[test]
    fn test_turn_image_caption_without_text() {
        let turn = json!({
            "speaker": "A",
            "dia_id": "D1",
            "img_url": "x",
            "blip_caption": "cat",
        });
        let parsed = parse_turn(&turn).unwrap();
        assert_eq!(parsed.text, "[Image: cat]");
    }

    #[test]
    fn test_turn_caption_alone_is_not_enough() {
        // Both the image reference and the caption must be present
        let turn = json!({
            "speaker": "A",
            "dia_id": "D1",
            "blip_caption": "cat",
            "text": "look",
        });
        let parsed = parse_turn(&turn).unwrap();
        assert_eq!(parsed.text, "look");
    }

    #[test]
    fn test_final_answer_selects_by_category() {
        let qa = QuestionAnswer {
            question: "q".into(),
            answer: Some("plain".into()),
            adversarial_answer: Some("tricky".into()),
            evidence: vec![],
            category: Some(5),
        };
        assert_eq!(qa.final_answer(), Some("tricky"));

        let qa = QuestionAnswer {
            category: Some(2),
            ..qa
        };
        assert_eq!(qa.final_answer(), Some("plain"));

        let qa = QuestionAnswer {
            category: None,
            ..qa
        };
        assert_eq!(qa.final_answer(), Some("plain"));
    }

    #[test]
    fn test_qa_missing_question_fails_sample() {
        let conv = json!({"speaker_a": "A", "speaker_b": "B"});
        let records = json!([minimal_sample(json!([{"answer": "x"}]), conv)]);
        let file = write_dataset(&records);

        let err = load_dataset(file.path()).unwrap_err();
        let chain = format!("{:#}", err);
        assert!(chain.contains("sample 0, QA pair 0"), "got: {}", chain);
        assert!(chain.contains("question"), "got: {}", chain);
    }

    #[test]
    fn test_qa_defaults_for_optional_fields() {
        let qa = parse_qa(&json!({"question": "Where?"})).unwrap();
        assert_eq!(qa.question, "Where?");
        assert_eq!(qa.answer, None);
        assert_eq!(qa.adversarial_answer, None);
        assert!(qa.evidence.is_empty());
        assert_eq!(qa.category, None);
    }

    #[test]
    fn test_qa_numeric_answer_coerced_to_text() {
        let qa = parse_qa(&json!({"question": "How many?", "answer": 4})).unwrap();
        assert_eq!(qa.answer.as_deref(), Some("4"));
    }

    #[test]
    fn test_evidence_has_image_suffix_match() {
        let conv = json!({
            "speaker_a": "A",
            "speaker_b": "B",
            "session_1": [
                {"speaker": "A", "dia_id": "D1:3", "text": "hi"},
                {"speaker": "B", "dia_id": "D1:4", "img_url": "u", "blip_caption": "dog"},
            ],
        });
        let conv = conv.as_object().unwrap();

        assert!(evidence_has_image(&["D1:4".to_string()], conv));
        // Matching turn has no image fields
        assert!(!evidence_has_image(&["D1:3".to_string()], conv));
        // References without a colon are skipped
        assert!(!evidence_has_image(&["D14".to_string()], conv));
    }

    #[test]
    fn test_evidence_suffix_matches_across_sessions() {
        // The suffix scan is deliberately approximate: a trailing-id
        // collision in another session also counts.
        let conv = json!({
            "speaker_a": "A",
            "speaker_b": "B",
            "session_1": [{"speaker": "A", "dia_id": "D1:12", "img_url": "u", "blip_caption": "c"}],
            "session_2": [{"speaker": "A", "dia_id": "D2:2", "text": "plain"}],
        });
        let conv = conv.as_object().unwrap();
        assert!(evidence_has_image(&["D2:12".to_string()], conv));
    }

    #[test]
    fn test_event_summary_shape_preserved() {
        let events = json!({
            "session_1": {"Ana": ["moved \u{1F600} house", "got a dog"], "Ben": []},
        });
        let parsed = parse_event_summary(events.as_object().unwrap()).unwrap();
        assert_eq!(
            parsed.events["session_1"]["Ana"],
            vec!["moved  house".to_string(), "got a dog".to_string()]
        );
        assert!(parsed.events["session_1"]["Ben"].is_empty());
    }

    #[test]
    fn test_observation_pairs_are_fixed_size() {
        let good = json!({
            "session_1": {"Ana": [["likes tea", "D1:2"]]},
        });
        let parsed = parse_observation(good.as_object().unwrap()).unwrap();
        let entry = &parsed.observations["session_1"]["Ana"][0];
        assert_eq!(entry.text, "likes tea");
        assert_eq!(entry.evidence, "D1:2");

        let bad = json!({
            "session_1": {"Ana": [["only text"]]},
        });
        let err = parse_observation(bad.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("expected 2"));
    }

    #[test]
    fn test_missing_conversation_key_is_fatal() {
        let records = json!([{
            "qa": [],
            "event_summary": {},
            "observation": {},
        }]);
        let file = write_dataset(&records);
        let err = load_dataset(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("conversation"));
    }

    #[test]
    fn test_dataset_statistics() {
        let conv = json!({
            "speaker_a": "A",
            "speaker_b": "B",
            "session_1": [
                {"speaker": "A", "dia_id": "D1:1", "text": "hi"},
                {"speaker": "B", "dia_id": "D1:2", "text": "hey"},
            ],
            "session_1_date_time": "1 May 2023",
        });
        let qa = json!([
            {"question": "q1", "answer": "a1"},
            {"question": "q2", "answer": "a2", "adversarial_answer": "x", "category": 5},
        ]);
        let records = json!([minimal_sample(qa, conv)]);
        let file = write_dataset(&records);

        let samples = load_dataset(file.path()).unwrap();
        let stats = DatasetStatistics::from_samples(&samples);
        assert_eq!(stats.num_samples, 1);
        assert_eq!(stats.total_qa_pairs, 2);
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.total_turns, 2);
        assert_eq!(stats.qa_with_adversarial, 1);
    }

    #[test]
    fn test_leaf_strings_sanitized_on_load() {
        let conv = json!({
            "speaker_a": "Ana\u{1F600}",
            "speaker_b": "B\u{e9}n",
            "session_1": [{"speaker": "Ana\u{1F600}", "dia_id": "D1:1", "text": "caf\u{e9} time"}],
            "session_1_date_time": "1 May 2023",
        });
        let records = json!([minimal_sample(json!([]), conv)]);
        let file = write_dataset(&records);

        let samples = load_dataset(file.path()).unwrap();
        let conversation = &samples[0].conversation;
        assert_eq!(conversation.speaker_a, "Ana");
        assert_eq!(conversation.speaker_b, "B?n");
        assert_eq!(conversation.sessions[&1].turns[0].text, "caf? time");
    }
}
