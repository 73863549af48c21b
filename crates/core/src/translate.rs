//! Translation of raw error codes and backend messages into user-facing text.
//!
//! The auth provider reports machine-readable codes; the REST backend only
//! English sentences. Both are mapped here, in one place, to the Spanish
//! strings shown to operators. Matching on messages is by case-insensitive
//! substring, first match wins.

use serde_json::Value;

/// Messages shorter than this are echoed back when nothing matches.
const ECHO_LIMIT: usize = 100;

const GENERIC: &str = "Ocurrió un error inesperado. Intenta nuevamente.";

const PROVIDER_CODES: &[(&str, &str)] = &[
    ("user_already_exists", "Este email ya está registrado."),
    ("invalid_credentials", "Email o contraseña incorrectos."),
    ("weak_password", "La contraseña es demasiado débil."),
    (
        "email_not_confirmed",
        "Debes confirmar tu email antes de ingresar.",
    ),
];

const MESSAGE_PATTERNS: &[(&[&str], &str)] = &[
    // Periods
    (&["no active period"], "No hay un período activo en este momento."),
    (&["period not found"], "No se encontró el período especificado."),
    (&["period already closed"], "Este período ya está cerrado."),
    (&["period already active"], "Ya existe un período activo."),
    // Products
    (&["product not found"], "No se encontró el producto."),
    (
        &["product already exists"],
        "Ya existe un producto con ese nombre.",
    ),
    // Categories
    (&["category not found"], "No se encontró la categoría."),
    (
        &["category already exists"],
        "Ya existe una categoría con ese nombre.",
    ),
    (
        &["category in use"],
        "No se puede eliminar la categoría porque está en uso.",
    ),
    // Records
    (&["record not found"], "No se encontró el registro."),
    (
        &["record already exists"],
        "Ya existe un registro para este producto en este período.",
    ),
    // Auth
    (
        &["invalid login credentials"],
        "Email o contraseña incorrectos.",
    ),
    (
        &["email rate limit exceeded"],
        "Demasiados intentos. Intenta nuevamente más tarde.",
    ),
    (
        &["unauthorized", "not authenticated"],
        "No tienes autorización para realizar esta acción.",
    ),
    // Validation
    (&["invalid email"], "El email ingresado no es válido."),
    (
        &["required field", "is required"],
        "Falta completar campos obligatorios.",
    ),
    (&["invalid format"], "El formato de los datos no es válido."),
    // Network
    (
        &["network", "fetch failed"],
        "Error de conexión. Verifica tu internet.",
    ),
    (
        &["timeout"],
        "La solicitud tardó demasiado. Intenta nuevamente.",
    ),
    // Server
    (
        &["internal server error", "500"],
        "Error en el servidor. Intenta nuevamente más tarde.",
    ),
    (
        &["service unavailable", "503"],
        "Servicio no disponible temporalmente.",
    ),
    // Images
    (
        &["file too large"],
        "El archivo es demasiado grande. Máximo 5MB.",
    ),
    (
        &["invalid file type"],
        "Tipo de archivo no permitido. Usa JPG, PNG o WEBP.",
    ),
];

/// Map a provider error code and/or raw message to user-facing text.
///
/// Codes are checked first, then message substrings. Unrecognized messages
/// under 100 characters are echoed as `Error: <message>`; longer ones get a
/// generic sentence.
///
/// ```
/// use stockcount_core::translate_error;
///
/// assert_eq!(
///     translate_error(None, "API error (404): Period not found"),
///     "No se encontró el período especificado."
/// );
/// assert_eq!(translate_error(None, "boom"), "Error: boom");
/// ```
#[must_use]
pub fn translate_error(code: Option<&str>, message: &str) -> String {
    if let Some(code) = code
        && let Some((_, text)) = PROVIDER_CODES.iter().find(|(known, _)| *known == code)
    {
        return (*text).to_owned();
    }

    let lower = message.to_lowercase();
    if let Some((_, text)) = MESSAGE_PATTERNS
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| lower.contains(needle)))
    {
        return (*text).to_owned();
    }

    if message.chars().count() < ECHO_LIMIT {
        return format!("Error: {message}");
    }

    GENERIC.to_owned()
}

/// Pull a human-readable message out of an error payload.
///
/// Looks at `message`, `error` (string or object with `message`), `msg`,
/// `error_description`, and `response.data.{message,error}`.
#[must_use]
pub fn extract_error_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(map) => {
            for key in ["message", "error", "msg", "error_description"] {
                match map.get(key) {
                    Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
                    Some(nested @ Value::Object(_)) => {
                        if let Some(found) = extract_error_message(nested) {
                            return Some(found);
                        }
                    }
                    _ => {}
                }
            }
            map.get("response")
                .and_then(|response| response.get("data"))
                .and_then(extract_error_message)
        }
        _ => None,
    }
}
