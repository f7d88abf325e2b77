// Configuration file loaders

use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `key=value` or `key: value` lines, `#` and `!` comments
    Properties,
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "properties" | "env" => Some(FileFormat::Properties),
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }

    /// Detect the format from a file extension
    pub fn detect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                ConfigError::LoadError(format!("No file extension found: {}", path.display()))
            })?;

        Self::from_extension(ext)
            .ok_or_else(|| ConfigError::LoadError(format!("Unsupported format: {}", ext)))
    }
}

/// Configuration file loader
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Loader for the format implied by `path`'s extension
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        FileFormat::detect(path).map(Self::new)
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Load a file into a JSON object
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        self.parse(&content)
    }

    /// Parse configuration text into a JSON object
    pub fn parse(&self, content: &str) -> Result<Value> {
        match self.format {
            FileFormat::Properties => Ok(parse_properties(content)),
            FileFormat::Json => parse_json(content),
            FileFormat::Toml => parse_toml(content),
        }
    }
}

fn parse_json(content: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e)))?;
    if !value.is_object() {
        return Err(ConfigError::ParseError(
            "JSON configuration must be an object".to_string(),
        ));
    }
    Ok(value)
}

fn parse_toml(content: &str) -> Result<Value> {
    let table: toml::Table = toml::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

    serde_json::to_value(table).map_err(|e| ConfigError::SerializationError(e.to_string()))
}

fn parse_properties(content: &str) -> Value {
    let mut map = Map::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        // A trailing backslash continues the entry on the next line
        let mut entry = line.to_string();
        while entry.ends_with('\\') {
            entry.pop();
            match lines.next() {
                Some(next) => entry.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = match entry.find(['=', ':']) {
            Some(at) => (&entry[..at], &entry[at + 1..]),
            None => (entry.as_str(), ""),
        };
        let value = value.trim().trim_matches('"');
        map.insert(key.trim().to_string(), Value::String(value.to_string()));
    }

    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_properties() {
        let loader = ConfigLoader::new(FileFormat::Properties);
        let result = loader
            .parse(
                r#"
                # Comment
                ! Also a comment
                scanPackage=web_demo
                contextPath : /app
                greeting = "hello world"
                url=http://localhost:8080/x
                flag
                "#,
            )
            .unwrap();

        assert_eq!(result["scanPackage"], "web_demo");
        assert_eq!(result["contextPath"], "/app");
        assert_eq!(result["greeting"], "hello world");
        assert_eq!(result["url"], "http://localhost:8080/x");
        assert_eq!(result["flag"], "");
    }

    #[test]
    fn test_properties_line_continuation() {
        let loader = ConfigLoader::new(FileFormat::Properties);
        let result = loader.parse("list=a,\\\n    b,\\\n    c\n").unwrap();
        assert_eq!(result["list"], "a,b,c");
    }

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let result = loader.parse(r#"{"scanPackage": "app", "port": 9000}"#).unwrap();
        assert_eq!(result["port"], 9000);

        assert!(loader.parse("[1, 2]").is_err());
        assert!(loader.parse("{").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let result = loader
            .parse(
                r#"
                scanPackage = "app"
                strictInjection = true
                "#,
            )
            .unwrap();

        assert_eq!(result["scanPackage"], "app");
        assert_eq!(result["strictInjection"], true);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            FileFormat::from_extension("properties"),
            Some(FileFormat::Properties)
        );
        assert_eq!(FileFormat::from_extension("JSON"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("toml"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("yaml"), None);

        assert_eq!(
            FileFormat::detect("conf/application.properties").unwrap(),
            FileFormat::Properties
        );
        assert!(FileFormat::detect("Makefile").is_err());
    }
}
