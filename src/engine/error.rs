//! Tipo de erro unificado do motor com formatação estável.
use core::fmt;
use std::collections::BTreeMap;

use crate::engine::error_catalog::{default_locale_message, EngineErrorCode};

const CONTEXT_VALUE_MAX: usize = 256;

fn sanitize_value(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|ch| match ch {
            '\n' | '\r' | '\t' => ' ',
            _ => ch,
        })
        .collect();
    if cleaned.chars().count() > CONTEXT_VALUE_MAX {
        let mut truncated = cleaned.chars().take(CONTEXT_VALUE_MAX - 1).collect::<String>();
        truncated.push('…');
        truncated
    } else {
        cleaned
    }
}

fn render_template(template: &str, context: &BTreeMap<String, String>) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut chars = template.chars();
    while let Some(ch) = chars.next() {
        if ch != '{' {
            rendered.push(ch);
            continue;
        }
        let mut key = String::new();
        for next in chars.by_ref() {
            if next == '}' {
                break;
            }
            key.push(next);
        }
        match context.get(&key) {
            Some(value) if !key.is_empty() => rendered.push_str(value),
            _ => {
                rendered.push('{');
                rendered.push_str(&key);
                rendered.push('}');
            }
        }
    }
    rendered
}

/// Erro do motor com contexto estruturado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub code: EngineErrorCode,
    pub context: BTreeMap<String, String>,
}

impl EngineError {
    /// Cria um novo erro sem contexto adicional.
    pub fn new(code: EngineErrorCode) -> Self {
        Self {
            code,
            context: BTreeMap::new(),
        }
    }

    /// Adiciona um par chave/valor ao contexto.
    pub fn with_context<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        let key_string = key.into();
        if !key_string.is_empty() {
            let sanitized = sanitize_value(&value.to_string());
            self.context.insert(key_string, sanitized);
        }
        self
    }

    #[inline]
    pub fn is(&self, code: EngineErrorCode) -> bool {
        self.code == code
    }

    fn resolved_message(&self) -> String {
        render_template(default_locale_message(self.code), &self.context)
    }

    /// Mensagem curta para UI.
    pub fn to_user_string(&self) -> String {
        format!("[{}] {}", self.code.code(), self.resolved_message())
    }

    /// Renderiza um template arbitrário usando o contexto atual.
    pub fn render_with_template(&self, template: &str) -> String {
        render_template(template, &self.context)
    }

    /// Status HTTP sugerido para a fronteira.
    pub fn http_status(&self) -> u16 {
        crate::engine::error_map::http_status(self.code)
    }

    /// Serialização estável em JSON para logs (chaves de contexto ordenadas).
    pub fn to_log_json(&self) -> String {
        serde_json::json!({
            "code": self.code.code(),
            "title": self.code.title(),
            "message": self.resolved_message(),
            "context": self.context,
        })
        .to_string()
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_user_string())
    }
}

impl std::error::Error for EngineError {}

impl From<EngineErrorCode> for EngineError {
    fn from(code: EngineErrorCode) -> Self {
        Self::new(code)
    }
}

/// Resultado padrão para operações do motor.
pub type Result<T> = std::result::Result<T, EngineError>;

#[macro_export]
macro_rules! engine_err {
  ($code:expr) => {{
    $crate::engine::error::EngineError::new($code)
  }};
  ($code:expr, $($key:ident => $value:expr),+ $(,)?) => {{
    let mut err = $crate::engine::error::EngineError::new($code);
    $(
      err = err.with_context(stringify!($key), $value);
    )+
    err
  }};
  ($code:expr, { $($key:expr => $value:expr),+ $(,)? }) => {{
    let mut err = $crate::engine::error::EngineError::new($code);
    $(
      err = err.with_context($key, $value);
    )+
    err
  }};
}

#[macro_export]
macro_rules! engine_bail {
  ($($tt:tt)*) => {
    return Err($crate::engine_err!($($tt)*))
  };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_string_basic() {
        let err = EngineError::new(EngineErrorCode::KycRequired);
        assert_eq!(err.to_user_string(), "[WXL-0011] complete a verificação KYC para continuar");
    }

    #[test]
    fn placeholder_subst() {
        let err = engine_err!(EngineErrorCode::WexelNotFound, wexel_id => 42);
        assert_eq!(err.to_user_string(), "[WXL-0003] wexel 42 não existe");
        assert_eq!(err.render_with_template("falha {wexel_id}"), "falha 42");
    }

    #[test]
    fn log_json_shape() {
        let err = engine_err!(EngineErrorCode::BoostTargetExceeded, { "max_boost" => "200.000000" });
        let v: serde_json::Value = serde_json::from_str(&err.to_log_json()).unwrap();
        assert_eq!(v["code"], "WXL-0006");
        assert_eq!(v["title"], "Alvo de boost excedido");
        assert_eq!(v["message"], "boost máximo adicional é 200.000000");
        assert_eq!(v["context"]["max_boost"], "200.000000");
    }

    #[test]
    fn empty_key_ignored() {
        let err = EngineError::new(EngineErrorCode::Overflow).with_context("", "x");
        assert!(err.context.is_empty());
    }
}
