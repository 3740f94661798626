//! Localized canned messages
//!
//! Every fixed string the assistant returns to a user, plus the prompt
//! instructions sent to the answer generator, lives here so a deployment
//! answers in exactly one language.

use serde::{Deserialize, Serialize};

/// Response language of a deployment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl std::str::FromStr for Locale {
    type Err = crate::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "es" | "spanish" | "español" => Ok(Self::Es),
            _ => Err(crate::ConfigError::InvalidValue {
                key: "EPIS_LOCALE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Fixed texts for one locale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    /// Closing message for the farewell intent
    pub farewell: &'static str,
    /// Question appended to problem-report answers
    pub follow_up_question: &'static str,
    /// Generic apology returned when anything fails
    pub internal_error: &'static str,
    /// Description stored when a ticket command carries no text
    pub ticket_placeholder: &'static str,
    /// Confirmation template; `{id}` and `{description}` are substituted
    pub ticket_confirmation: &'static str,
    /// Used when the generator returns nothing for a general question
    pub no_answer: &'static str,
    /// Used when the generator returns nothing for a problem report
    pub no_solution: &'static str,
    /// Literal refusal the model must give when the context lacks the answer
    pub insufficient_information: &'static str,
    /// Role given to the model
    pub prompt_role: &'static str,
    /// Constraints listed in the prompt
    pub prompt_rules: &'static [&'static str],
    /// Label preceding the retrieved context
    pub prompt_context_label: &'static str,
    /// Label preceding the question
    pub prompt_question_label: &'static str,
    /// Label the model completes
    pub prompt_answer_label: &'static str,
}

const ENGLISH: Messages = Messages {
    farewell: "You're welcome, happy to help! If you have any other question, I'll be here. 😊",
    follow_up_question: "Does this information solve your problem?",
    internal_error: "Sorry, an internal server error has occurred.",
    ticket_placeholder: "problem not specified by user",
    ticket_confirmation: "Done. I have created support ticket #{id} with your problem: '{description}'. The technical team will contact you.",
    no_answer: "No answer was found.",
    no_solution: "I could not find a specific solution.",
    insufficient_information: "I don't have enough information in my documents",
    prompt_role: "You are a helpful and direct technical support assistant.",
    prompt_rules: &[
        "Use ONLY the following context to answer the question.",
        "If the answer is not in the context, say \"I don't have enough information in my documents\".",
        "ALWAYS answer in English.",
        "Be concise (2 sentences maximum).",
    ],
    prompt_context_label: "Context:",
    prompt_question_label: "Question:",
    prompt_answer_label: "Answer:",
};

const SPANISH: Messages = Messages {
    farewell: "De nada, ¡un placer ayudar! Si tienes cualquier otra consulta, aquí estaré. 😊",
    follow_up_question: "¿Esta información soluciona tu problema?",
    internal_error: "Lo siento, ha ocurrido un error interno en el servidor.",
    ticket_placeholder: "Problema no especificado por el usuario.",
    ticket_confirmation: "De acuerdo. He creado el ticket de soporte #{id} con tu problema: '{description}'. El equipo técnico se pondrá en contacto contigo.",
    no_answer: "No se encontró respuesta.",
    no_solution: "No he encontrado una solución específica.",
    insufficient_information: "No tengo información suficiente en mis documentos",
    prompt_role: "Eres un asistente de soporte técnico útil y directo.",
    prompt_rules: &[
        "Usa SOLO el siguiente contexto para responder a la pregunta.",
        "Si la respuesta no está en el contexto, di \"No tengo información suficiente en mis documentos\".",
        "Responde SIEMPRE en Español.",
        "Sé conciso (máximo 2 frases).",
    ],
    prompt_context_label: "Contexto:",
    prompt_question_label: "Pregunta:",
    prompt_answer_label: "Respuesta:",
};

impl Messages {
    /// Messages for a locale
    pub fn for_locale(locale: Locale) -> &'static Messages {
        match locale {
            Locale::En => &ENGLISH,
            Locale::Es => &SPANISH,
        }
    }

    /// Render the ticket confirmation for a stored ticket
    pub fn ticket_created(&self, id: i64, description: &str) -> String {
        self.ticket_confirmation
            .replace("{id}", &id.to_string())
            .replace("{description}", description)
    }
}
