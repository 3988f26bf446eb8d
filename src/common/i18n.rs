// src/common/i18n.rs

use std::collections::HashMap;

const DEFAULT_LANG: &str = "en";

// Os catálogos vão embutidos no binário
const CATALOGS: [(&str, &str); 3] = [
    ("en", include_str!("../../locales/en.json")),
    ("es", include_str!("../../locales/es.json")),
    ("pt", include_str!("../../locales/pt.json")),
];

/// Mensagens de erro por idioma. Templates usam `{0}`, `{1}`...
#[derive(Debug, Clone, Default)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut catalogs = HashMap::new();
        for (lang, raw) in CATALOGS {
            let messages: HashMap<String, String> = serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("Catálogo '{}' inválido: {}", lang, e))?;
            catalogs.insert(lang.to_string(), messages);
        }
        Ok(Self { catalogs })
    }

    /// Idioma pedido -> inglês -> a própria chave.
    pub fn translate(&self, lang: &str, key: &str, args: &[String]) -> String {
        let template = self
            .catalogs
            .get(lang)
            .and_then(|c| c.get(key))
            .or_else(|| self.catalogs.get(DEFAULT_LANG).and_then(|c| c.get(key)));

        let Some(template) = template else {
            return key.to_string();
        };

        args.iter()
            .enumerate()
            .fold(template.clone(), |msg, (i, arg)| msg.replace(&format!("{{{i}}}"), arg))
    }
}
