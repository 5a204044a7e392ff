//! Fixed user-facing strings produced by the core.

use std::fmt::{self, Display};
use std::str::FromStr;

/// A language the client can speak.
///
/// The core only produces two strings on its own: the placeholder shown
/// for an image-only message and the text of a failed turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Locale {
    /// Spanish (Spain).
    #[default]
    EsEs,
    /// English (United States).
    EnUs,
    /// Portuguese (Brazil).
    PtBr,
}

impl Locale {
    /// Shown instead of text when a message only carries images.
    pub fn images_sent(self) -> &'static str {
        match self {
            Locale::EsEs => "📷 Imagen(es) enviada(s)",
            Locale::EnUs => "📷 Image(s) sent",
            Locale::PtBr => "📷 Imagem(ns) enviada(s)",
        }
    }

    /// Shown as the assistant's reply when a turn could not be delivered.
    pub fn delivery_error(self) -> &'static str {
        match self {
            Locale::EsEs => {
                "Lo siento, hubo un error al procesar tu mensaje. \
                 Por favor, intenta de nuevo."
            }
            Locale::EnUs => {
                "Sorry, there was an error processing your message. \
                 Please try again."
            }
            Locale::PtBr => {
                "Desculpe, houve um erro ao processar sua mensagem. \
                 Por favor, tente novamente."
            }
        }
    }

    /// Returns the BCP 47 tag.
    pub fn tag(self) -> &'static str {
        match self {
            Locale::EsEs => "es-ES",
            Locale::EnUs => "en-US",
            Locale::PtBr => "pt-BR",
        }
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Returned when parsing an unsupported language tag.
#[derive(Debug, thiserror::Error)]
#[error("unsupported locale: {0}")]
pub struct UnknownLocale(String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Locale::EsEs, Locale::EnUs, Locale::PtBr]
            .into_iter()
            .find(|locale| locale.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownLocale(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("en-US".parse::<Locale>().unwrap(), Locale::EnUs);
        assert_eq!("pt-br".parse::<Locale>().unwrap(), Locale::PtBr);
        assert!("fr-FR".parse::<Locale>().is_err());
    }
}
