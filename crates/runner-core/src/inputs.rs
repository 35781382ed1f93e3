use std::collections::BTreeMap;

/// Environment prefix GitHub Actions puts on action inputs.
pub const INPUT_PREFIX: &str = "INPUT_";

/// Action inputs taken from `INPUT_*` environment variables, keyed by
/// lowerCamelCase name (`INPUT_TASK_DEFINITION` -> `taskDefinition`), which
/// lines them up with the RunTask field names of the task template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionInputs {
    inputs: BTreeMap<String, String>,
}

impl ActionInputs {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Keep the prefixed variables, strip the prefix and camel-case the rest.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let inputs = vars
            .into_iter()
            .filter_map(|(key, value)| {
                let name = key.as_ref().strip_prefix(INPUT_PREFIX)?;
                Some((snake_to_camel(name), value.into()))
            })
            .collect();
        Self { inputs }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inputs.get(name).map(String::as_str)
    }

    /// Like [`get`](Self::get), treating an empty value as absent.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inputs.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inputs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn should_wait(&self) -> bool {
        self.get("wait") == Some("true")
    }
}

/// `CAMEL_CASE` -> `camelCase`.
pub fn snake_to_camel(name: &str) -> String {
    let upper_camel: String = name
        .to_lowercase()
        .split('_')
        .map(title_case)
        .collect();

    let mut chars = upper_camel.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Uppercase every letter that does not follow another letter, lowercase the
/// rest: `2fa` -> `2Fa`.
fn title_case(word: &str) -> String {
    let mut titled = String::with_capacity(word.len());
    let mut after_letter = false;
    for c in word.chars() {
        if after_letter {
            titled.extend(c.to_lowercase());
        } else {
            titled.extend(c.to_uppercase());
        }
        after_letter = c.is_lowercase() || c.is_uppercase();
    }
    titled
}
