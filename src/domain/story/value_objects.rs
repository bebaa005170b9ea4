//! Story Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 故事唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoryId(Uuid);

impl StoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for StoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 章节唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChapterId(Uuid);

impl ChapterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ChapterId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChapterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 标题（故事和章节共用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title(String);

impl Title {
    pub fn new(title: impl Into<String>) -> Result<Self, &'static str> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err("标题不能为空");
        }
        if title.chars().count() > 200 {
            return Err("标题长度不能超过200字符");
        }
        Ok(Self(title))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Title {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 用户输入的故事提示词
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt(String);

impl Prompt {
    pub const MAX_CHARS: usize = 2000;

    pub fn new(prompt: impl Into<String>) -> Result<Self, &'static str> {
        let prompt = prompt.into().trim().to_string();
        if prompt.is_empty() {
            return Err("提示词不能为空");
        }
        if prompt.chars().count() > Self::MAX_CHARS {
            return Err("提示词长度不能超过2000字符");
        }
        Ok(Self(prompt))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 章节插图（PNG/JPEG 原始字节）
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload(Vec<u8>);

impl ImagePayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for ImagePayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ImagePayload({} bytes)", self.0.len())
    }
}

/// 章节朗读音频（MP3 原始字节）
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPayload(Vec<u8>);

impl AudioPayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for AudioPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for AudioPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AudioPayload({} bytes)", self.0.len())
    }
}

/// 朗读音色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrationVoice {
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

impl NarrationVoice {
    pub const ALL: [NarrationVoice; 6] = [
        NarrationVoice::Alloy,
        NarrationVoice::Echo,
        NarrationVoice::Fable,
        NarrationVoice::Onyx,
        NarrationVoice::Nova,
        NarrationVoice::Shimmer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NarrationVoice::Alloy => "alloy",
            NarrationVoice::Echo => "echo",
            NarrationVoice::Fable => "fable",
            NarrationVoice::Onyx => "onyx",
            NarrationVoice::Nova => "nova",
            NarrationVoice::Shimmer => "shimmer",
        }
    }

    /// 忽略大小写解析
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|voice| voice.as_str() == s)
    }

    /// 展示名（首字母大写）
    pub fn display_name(&self) -> &'static str {
        match self {
            NarrationVoice::Alloy => "Alloy",
            NarrationVoice::Echo => "Echo",
            NarrationVoice::Fable => "Fable",
            NarrationVoice::Onyx => "Onyx",
            NarrationVoice::Nova => "Nova",
            NarrationVoice::Shimmer => "Shimmer",
        }
    }
}

impl Default for NarrationVoice {
    fn default() -> Self {
        NarrationVoice::Alloy
    }
}

impl std::fmt::Display for NarrationVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
