// src/topics.rs
//! Static topic table. Each topic binds one content source and one rewriting
//! style directive; the set is fixed configuration, not runtime-mutable.

/// Topic substituted whenever a destination's effective topic set would be empty.
pub const DEFAULT_TOPIC: &str = "programming";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic {
    /// Stable key used in destination settings and source registry lookups.
    pub key: &'static str,
    /// Human-readable label shown in logs and the admin shell.
    pub label: &'static str,
    /// Style directive sent to the rewrite service together with the candidate.
    pub style: &'static str,
}

pub const TOPICS: &[Topic] = &[
    Topic {
        key: "programming",
        label: "Programming",
        style: "You are a sharp, friendly tech writer. Keep a casual tone and keep \
                jargon like API, bug or server as-is. Close with a personal take and \
                a question to the audience. If the material is promotional or \
                worthless, reply with exactly: STOP",
    },
    Topic {
        key: "ai",
        label: "AI",
        style: "You are an AI practitioner. Plain, informed tone. Focus on what the \
                news means in practice. If the material is hollow, reply with \
                exactly: STOP",
    },
    Topic {
        key: "design",
        label: "Design",
        style: "You are a creative designer. Artful, engaging tone; comment on the \
                aesthetics. If the material is hollow, reply with exactly: STOP",
    },
    Topic {
        key: "poetry",
        label: "Poetry",
        style: "You are a literary writer. Introduce this poem with a short, \
                heartfelt preface and a brief note on its meaning. If the text is \
                unsuitable, reply with exactly: STOP",
    },
    Topic {
        key: "religious",
        label: "Religious",
        style: "You are a calm spiritual counselor. Introduce this passage warmly \
                and draw out one moral point. If the text is unsuitable, reply with \
                exactly: STOP",
    },
];

pub fn get(key: &str) -> Option<&'static Topic> {
    TOPICS.iter().find(|t| t.key == key)
}

pub fn default_topic() -> &'static Topic {
    get(DEFAULT_TOPIC).expect("default topic must be in the table")
}
