use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 默认方面名称
pub const DEFAULT_ASPECT: &str = "default";

/// 未指定提示词时使用的默认提示词
pub const DEFAULT_PROMPT: &str = "Describe this image in detail:";

/// 内置方面及其提示词
const PRESETS: &[(&str, &str)] = &[
    (DEFAULT_ASPECT, DEFAULT_PROMPT),
    (
        "safety",
        "Describe any safety hazards, risky behaviour or unsafe conditions visible in this image:",
    ),
    (
        "aesthetic",
        "Describe the composition, lighting, colours and overall aesthetic quality of this image:",
    ),
];

/// 方面：一个名称加一个提示词，同一张图片的每个方面都有独立的描述和向量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aspect {
    pub name: String,
    pub prompt: String,
}

impl Aspect {
    /// 创建方面
    ///
    /// 提示词优先使用 `prompt`，其次是内置预设，最后是 [`DEFAULT_PROMPT`]
    pub fn new(name: impl Into<String>, prompt: Option<String>) -> Result<Self> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidAspect(name.to_owned()));
        }
        let prompt = prompt
            .filter(|p| !p.trim().is_empty())
            .or_else(|| preset_prompt(name).map(str::to_owned))
            .unwrap_or_else(|| DEFAULT_PROMPT.to_owned());
        Ok(Self { name: name.to_owned(), prompt })
    }

    /// 是否为内置方面
    pub fn is_preset(&self) -> bool {
        preset_prompt(&self.name).is_some()
    }
}

impl Default for Aspect {
    fn default() -> Self {
        Self { name: DEFAULT_ASPECT.to_owned(), prompt: DEFAULT_PROMPT.to_owned() }
    }
}

/// 内置方面的提示词
pub fn preset_prompt(name: &str) -> Option<&'static str> {
    PRESETS.iter().find(|(n, _)| *n == name).map(|(_, p)| *p)
}

/// 所有内置方面名称
pub fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(n, _)| *n)
}
