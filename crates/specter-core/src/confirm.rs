use dialoguer::{Confirm as Prompt, console::Term};
use tracing::warn;

/// Confirmación sí/no de un operador humano.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Pregunta por la terminal. Si no hay terminal interactiva, responde que no.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleConfirm;

impl Confirm for ConsoleConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        match Prompt::new()
            .with_prompt(prompt)
            .default(false)
            .interact_on(&Term::stderr())
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "could not read confirmation, assuming no");
                false
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysYes;

impl Confirm for AlwaysYes {
    fn confirm(&self, _: &str) -> bool {
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysNo;

impl Confirm for AlwaysNo {
    fn confirm(&self, _: &str) -> bool {
        false
    }
}
