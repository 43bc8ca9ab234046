use serde::de::DeserializeOwned;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        if path == "." {
            format!("line {}: {inner}", inner.line())
        } else {
            format!("at `{path}` (line {}): {inner}", inner.line())
        }
    })
}
