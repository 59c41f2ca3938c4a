//! Stock converters.

use super::suggestion::limit_by_prefix;
use super::{ArgumentConverter, ConversionFailure};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

/// Converter built from a function producing exactly one value.
pub struct SimpleArgumentConverter<T> {
    convert: Arc<dyn Fn(&str) -> Result<T, String> + Send + Sync>,
    description: String,
}

impl<T> SimpleArgumentConverter<T> {
    pub fn from_single<F>(convert: F, description: impl Into<String>) -> Self
    where
        F: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    {
        Self {
            convert: Arc::new(convert),
            description: description.into(),
        }
    }
}

impl<T> Clone for SimpleArgumentConverter<T> {
    fn clone(&self) -> Self {
        Self {
            convert: Arc::clone(&self.convert),
            description: self.description.clone(),
        }
    }
}

impl<T> ArgumentConverter<T> for SimpleArgumentConverter<T> {
    fn convert(&self, token: &str) -> Result<Vec<T>, ConversionFailure> {
        (self.convert)(token).map(|value| vec![value]).map_err(|reason| {
            ConversionFailure::new(token, self.description.clone()).with_reason(reason)
        })
    }

    fn describe_acceptable_arguments(&self) -> String {
        self.description.clone()
    }
}

/// Accepts any token verbatim.
pub fn string() -> SimpleArgumentConverter<String> {
    SimpleArgumentConverter::from_single(|token| Ok(token.to_string()), "any text")
}

/// Converter for any [`FromStr`] type.
pub fn from_str<T>() -> SimpleArgumentConverter<T>
where
    T: FromStr + 'static,
    T::Err: Display,
{
    SimpleArgumentConverter::from_single(
        |token| token.parse::<T>().map_err(|e| e.to_string()),
        format!("any {}", describe_type::<T>()),
    )
}

/// Accepts exactly one character.
pub fn character() -> SimpleArgumentConverter<char> {
    SimpleArgumentConverter::from_single(
        |token| {
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err("expected a single character".to_string()),
            }
        },
        "any character",
    )
}

fn describe_type<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    match name {
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
        | "u128" | "usize" => "integer",
        "f32" | "f64" => "number",
        _ => name.rsplit("::").next().unwrap_or(name),
    }
}

const TRUTHY: [&str; 3] = ["true", "yes", "on"];
const FALSY: [&str; 3] = ["false", "no", "off"];

/// Case-insensitive boolean words.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConverter;

pub fn boolean() -> BooleanConverter {
    BooleanConverter
}

impl ArgumentConverter<bool> for BooleanConverter {
    fn convert(&self, token: &str) -> Result<Vec<bool>, ConversionFailure> {
        let lower = token.to_lowercase();
        if TRUTHY.contains(&lower.as_str()) {
            Ok(vec![true])
        } else if FALSY.contains(&lower.as_str()) {
            Ok(vec![false])
        } else {
            Err(ConversionFailure::new(token, self.describe_acceptable_arguments()))
        }
    }

    fn describe_acceptable_arguments(&self) -> String {
        TRUTHY
            .iter()
            .zip(FALSY.iter())
            .flat_map(|(t, f)| [*t, *f])
            .collect::<Vec<_>>()
            .join("|")
    }

    fn suggestions(&self, partial: &str) -> Vec<String> {
        limit_by_prefix(TRUTHY.iter().chain(FALSY.iter()), partial)
    }
}

/// Choice among items, each reachable through one or more case-insensitive keys.
///
/// The first key of every item is its primary key: it is the one listed in
/// the description and offered as a suggestion.
///
/// ```
/// use piston::converter::{ArgumentConverter, MultiKeyConverter};
///
/// let axis = MultiKeyConverter::from_items([
///     ('x', vec!["x", "east"]),
///     ('y', vec!["y", "up"]),
/// ]);
/// assert_eq!(axis.convert("UP").unwrap(), vec!['y']);
/// assert_eq!(axis.describe_acceptable_arguments(), "x|y");
/// ```
#[derive(Debug, Clone)]
pub struct MultiKeyConverter<E> {
    by_key: HashMap<String, E>,
    primary_keys: Vec<String>,
    unknown_value: Option<E>,
}

impl<E: Clone> MultiKeyConverter<E> {
    /// Items with an empty key list are unreachable and are skipped.
    pub fn from_items<I, K, S>(items: I) -> Self
    where
        I: IntoIterator<Item = (E, K)>,
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut by_key = HashMap::new();
        let mut primary_keys = Vec::new();
        for (item, keys) in items {
            let mut keys = keys.into_iter().map(Into::into).peekable();
            let Some(primary) = keys.peek().cloned() else {
                continue;
            };
            if !primary_keys.contains(&primary) {
                primary_keys.push(primary);
            }
            for key in keys {
                by_key.insert(key.to_lowercase(), item.clone());
            }
        }
        Self {
            by_key,
            primary_keys,
            unknown_value: None,
        }
    }

    /// Value produced for tokens matching no key, instead of failing.
    pub fn with_unknown_value(mut self, value: E) -> Self {
        self.unknown_value = Some(value);
        self
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }
}

/// Choice among fixed words, each converting to itself.
pub fn choice<I, S>(choices: I) -> MultiKeyConverter<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    MultiKeyConverter::from_items(choices.into_iter().map(|c| {
        let c = c.into();
        (c.clone(), [c])
    }))
}

impl<E: Clone + Send + Sync> ArgumentConverter<E> for MultiKeyConverter<E> {
    fn convert(&self, token: &str) -> Result<Vec<E>, ConversionFailure> {
        self.by_key
            .get(&token.to_lowercase())
            .or(self.unknown_value.as_ref())
            .map(|item| vec![item.clone()])
            .ok_or_else(|| ConversionFailure::new(token, self.describe_acceptable_arguments()))
    }

    fn describe_acceptable_arguments(&self) -> String {
        self.primary_keys.join("|")
    }

    fn suggestions(&self, partial: &str) -> Vec<String> {
        limit_by_prefix(&self.primary_keys, partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_accepts_anything() {
        assert_eq!(string().convert("-5").unwrap(), vec!["-5".to_string()]);
        assert_eq!(string().describe_acceptable_arguments(), "any text");
    }

    #[test]
    fn test_from_str_integer() {
        let conv = from_str::<i32>();
        assert_eq!(conv.convert("-12").unwrap(), vec![-12]);
        assert_eq!(conv.describe_acceptable_arguments(), "any integer");

        let failure = conv.convert("twelve").unwrap_err();
        assert_eq!(failure.token, "twelve");
        assert_eq!(failure.acceptable, "any integer");
        assert!(failure.reason.is_some());
    }

    #[test]
    fn test_from_str_float_description() {
        assert_eq!(from_str::<f64>().describe_acceptable_arguments(), "any number");
    }

    #[test]
    fn test_character() {
        assert_eq!(character().convert("x").unwrap(), vec!['x']);
        assert!(character().convert("xy").is_err());
        assert!(character().convert("").is_err());
    }

    #[test]
    fn test_boolean_words() {
        let conv = boolean();
        assert_eq!(conv.convert("YES").unwrap(), vec![true]);
        assert_eq!(conv.convert("off").unwrap(), vec![false]);
        assert!(conv.convert("maybe").is_err());
        assert_eq!(conv.describe_acceptable_arguments(), "true|false|yes|no|on|off");
        assert_eq!(conv.suggestions("o"), vec!["on", "off"]);
    }

    #[test]
    fn test_multi_key_lookup() {
        let conv = MultiKeyConverter::from_items([
            (1u8, vec!["one", "uno"]),
            (2u8, vec!["two", "dos"]),
            (3u8, vec![]),
        ]);
        assert_eq!(conv.convert("Uno").unwrap(), vec![1]);
        assert_eq!(conv.convert("two").unwrap(), vec![2]);
        assert!(conv.convert("three").is_err());
        assert_eq!(conv.primary_keys(), ["one", "two"]);
        assert_eq!(conv.suggestions("t"), vec!["two"]);
    }

    #[test]
    fn test_multi_key_unknown_value() {
        let conv = choice(["stone", "dirt"]).with_unknown_value("air".to_string());
        assert_eq!(conv.convert("gravel").unwrap(), vec!["air".to_string()]);
        assert_eq!(conv.convert("STONE").unwrap(), vec!["stone".to_string()]);
    }
}
