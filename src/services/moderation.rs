// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Profanity filter.
//!
//! Case-insensitive substring match against a fixed word list. This is an
//! input-quality check for user text, not an enforcement boundary.

use std::borrow::Cow;
use validator::ValidationError;

/// Banned substrings, English and Chinese.
pub const BANNED_WORDS: &[&str] = &[
    "fuck",
    "fucking",
    "shit",
    "bullshit",
    "bitch",
    "asshole",
    "bastard",
    "dick",
    "pussy",
    "cunt",
    "motherfucker",
    "slut",
    "whore",
    "操你",
    "操你妈",
    "傻逼",
    "傻B",
    "傻b",
    "妈的",
    "他妈的",
    "去你妈",
    "你妈",
    "垃圾",
    "畜生",
    "狗娘养",
    "死妈",
    "死全家",
    "滚你妈",
    "王八蛋",
    "混蛋",
];

/// Message shown inline when a field trips the filter.
pub const PROFANITY_MESSAGE: &str = "内容包含不当用语，请修改后再提交";

/// True if `text` contains any banned word, ignoring case.
pub fn contains_profanity(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let lowered = text.to_lowercase();
    BANNED_WORDS
        .iter()
        .any(|word| lowered.contains(&word.to_lowercase()))
}

/// `validator` custom rule: `#[validate(custom(function = "validate_clean"))]`.
pub fn validate_clean(text: &str) -> Result<(), ValidationError> {
    if contains_profanity(text) {
        return Err(ValidationError::new("profanity").with_message(Cow::Borrowed(PROFANITY_MESSAGE)));
    }
    Ok(())
}

/// Same rule over a list of strings (tags).
pub fn validate_clean_all(items: &[String]) -> Result<(), ValidationError> {
    items.iter().try_for_each(|item| validate_clean(item))
}
