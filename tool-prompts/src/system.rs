//! System instructions shared by every prompt of a kind.

/// Represents a system instruction applied to all downstream prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInstruction {
    content: String,
}

/// Builder for [`SystemInstruction`].
#[derive(Debug, Default)]
pub struct SystemInstructionBuilder {
    content: String,
}

impl SystemInstructionBuilder {
    /// Creates a new builder instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the instruction content.
    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Appends a paragraph, separated from existing content by a blank line.
    #[must_use]
    pub fn paragraph(mut self, text: impl AsRef<str>) -> Self {
        if !self.content.is_empty() {
            self.content.push_str("\n\n");
        }
        self.content.push_str(text.as_ref());
        self
    }

    /// Builds the instruction.
    #[must_use]
    pub fn build(self) -> SystemInstruction {
        SystemInstruction {
            content: self.content,
        }
    }
}

impl SystemInstruction {
    /// Returns a new builder.
    #[must_use]
    pub fn builder() -> SystemInstructionBuilder {
        SystemInstructionBuilder::new()
    }

    /// Returns the textual content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}
