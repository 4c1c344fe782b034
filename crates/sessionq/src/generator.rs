use crate::GenerationError;
use chrono::Local;
use std::sync::Arc;

/// Produces the response text for a prompt.
///
/// Generation is synchronous and assumed free of side effects. Failures are
/// reported through [`GenerationError`] and never propagate past the worker.
pub trait ResponseGenerator: Send + Sync + 'static {
    /// # Errors
    ///
    /// Returns a [`GenerationError`] if no response could be produced.
    fn generate(&self, payload: &str) -> Result<String, GenerationError>;
}

impl<G> ResponseGenerator for Arc<G>
where
    G: ResponseGenerator,
{
    fn generate(&self, payload: &str) -> Result<String, GenerationError> {
        (**self).generate(payload)
    }
}

/// Stand-in for a language model: echoes the prompt inside a canned answer.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedResponder {
    advertised_delay_secs: u64,
}

impl SimulatedResponder {
    /// `advertised_delay_secs` is the processing time the canned text claims.
    pub const fn new(advertised_delay_secs: u64) -> Self {
        Self {
            advertised_delay_secs,
        }
    }
}

impl Default for SimulatedResponder {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ResponseGenerator for SimulatedResponder {
    fn generate(&self, payload: &str) -> Result<String, GenerationError> {
        Ok(format!(
            "I've analyzed your prompt: \"{payload}\"\n\n\
             This is a simulated response from an LLM. In a real application, this would be \
             the output from a hosted or local language model.\n\n\
             The response considers your question and provides a thoughtful answer. \
             It took about {} seconds to process, simulating the time an actual LLM might take.\n\n\
             [Generated at {}]",
            self.advertised_delay_secs,
            Local::now().format("%H:%M:%S"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_the_prompt() {
        let text = SimulatedResponder::default().generate("hello").unwrap();
        assert!(text.starts_with("I've analyzed your prompt: \"hello\""));
        assert!(text.contains("about 10 seconds"));
    }

    #[test]
    fn ends_with_generation_timestamp() {
        let text = SimulatedResponder::new(2).generate("x").unwrap();
        let stamp = text.rsplit("[Generated at ").next().unwrap();
        let stamp = stamp.trim_end_matches(']');
        assert_eq!(stamp.len(), "HH:MM:SS".len());
        assert_eq!(stamp.matches(':').count(), 2);
    }

    #[test]
    fn works_behind_an_arc() {
        let generator = Arc::new(SimulatedResponder::new(1));
        assert!(generator.generate("a").is_ok());
    }
}
