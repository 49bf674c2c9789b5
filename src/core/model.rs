use serde::{Deserialize, Deserializer, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Novel {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct StoryFields {
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub mainline: String,
    #[serde(default)]
    pub darkline: String,
}

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct AdvancedFields {
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub core_design: String,
    #[serde(default)]
    pub reversal: String,
    #[serde(default)]
    pub highlights: String,
}

/// `GET /api/novels/{id}` aggregate.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NovelDetail {
    pub novel: Novel,
    #[serde(default, deserialize_with = "null_as_default")]
    pub story: StoryFields,
    #[serde(default, deserialize_with = "null_as_default")]
    pub advanced: AdvancedFields,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// --- Sections & fields ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Story,
    Advanced,
}

impl Section {
    pub const ALL: [Section; 2] = [Section::Story, Section::Advanced];

    pub fn name(&self) -> &'static str {
        match self {
            Section::Story => "story",
            Section::Advanced => "advanced",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Section::Story => "故事背景",
            Section::Advanced => "高级设计",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self {
            Section::Story => "整理世界观与主线脉络",
            Section::Advanced => "强化风格与反转结构",
        }
    }

    pub fn fields(&self) -> &'static [Field] {
        match self {
            Section::Story => &[Field::Background, Field::Mainline, Field::Darkline],
            Section::Advanced => &[
                Field::Style,
                Field::CoreDesign,
                Field::Reversal,
                Field::Highlights,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Background,
    Mainline,
    Darkline,
    Style,
    CoreDesign,
    Reversal,
    Highlights,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Background,
        Field::Mainline,
        Field::Darkline,
        Field::Style,
        Field::CoreDesign,
        Field::Reversal,
        Field::Highlights,
    ];

    /// Wire name, also used as the element id in the web front end.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Background => "background",
            Field::Mainline => "mainline",
            Field::Darkline => "darkline",
            Field::Style => "style",
            Field::CoreDesign => "core_design",
            Field::Reversal => "reversal",
            Field::Highlights => "highlights",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Background => "背景设定",
            Field::Mainline => "主线",
            Field::Darkline => "暗线",
            Field::Style => "风格",
            Field::CoreDesign => "核心设计",
            Field::Reversal => "反转",
            Field::Highlights => "亮点",
        }
    }

    pub fn section(&self) -> Section {
        match self {
            Field::Background | Field::Mainline | Field::Darkline => Section::Story,
            _ => Section::Advanced,
        }
    }

    pub fn default_instruction(&self) -> &'static str {
        match self {
            Field::Background => "在不改变设定的前提下，优化表达更清晰、更有画面感、更有张力。",
            Field::Mainline => "梳理事件因果与节奏，突出目标、阻力与转折点，表达更紧凑清晰。",
            Field::Darkline => "增强伏笔与信息差设计，保证逻辑自洽，表达更具悬念。",
            Field::Style => "提炼风格关键词与叙事气质，给出更明确可执行的写作指引。",
            Field::CoreDesign => "明确核心谜题、关键线索与解谜路径，保证逻辑自洽。",
            Field::Reversal => "设计反转的触发点与信息披露顺序，保证反转合理且冲击力强。",
            Field::Highlights => "提炼差异化卖点与读者记忆点，语言更有吸引力。",
        }
    }
}

/// Default optimize instruction by wire name; unknown names get an empty string.
pub fn default_instruction_for(name: &str) -> &'static str {
    Field::from_name(name)
        .map(|f| f.default_instruction())
        .unwrap_or("")
}

// --- Chat ---

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Anything that is not `user` renders as the assistant.
    pub fn from_wire(value: &str) -> Self {
        if value == "user" {
            Role::User
        } else {
            Role::Assistant
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "你",
            Role::Assistant => "AI",
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Role::from_wire(&raw))
    }
}

/// Session-local correlation id for a pending assistant message.
///
/// Wall-clock milliseconds plus a random fraction: collisions are unlikely within
/// one session but not ruled out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessageId(pub f64);

impl MessageId {
    pub fn generate(now_ms: f64) -> Self {
        MessageId(now_ms + rand::random::<f64>())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    #[serde(skip)]
    pub id: Option<MessageId>,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(skip)]
    pub loading: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: None,
            role: Role::User,
            content: content.into(),
            loading: false,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: None,
            role: Role::Assistant,
            content: content.into(),
            loading: false,
        }
    }

    pub fn pending(id: MessageId) -> Self {
        Self {
            id: Some(id),
            role: Role::Assistant,
            content: String::new(),
            loading: true,
        }
    }

    /// Copy is offered only for settled, non-blank messages.
    pub fn can_copy(&self) -> bool {
        !self.loading && !self.content.trim().is_empty()
    }
}
