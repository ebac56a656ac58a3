//! Modality adapters: the capability set that parameterizes the generic
//! conversation manager and orchestrator over text, SVG, and image output.

use async_trait::async_trait;

use canvaschat_api::client::{
    CompletionClient, ImageClient, ImageRequest, ProviderHandle,
};
use canvaschat_types::{
    Attachment, ContentPart, GeneratedImage, HistoryEntry, ImageRef, Message, MessageContent,
    TokenUsage,
};

use crate::conversation::Conversation;
use crate::error::ChatError;
use crate::orchestrator::SendOptions;
use crate::svg::extract_svg;

/// One completed provider exchange.
pub struct Exchange<T> {
    pub output: T,
    pub usage: Option<TokenUsage>,
}

/// Per-modality behavior plugged into the generic conversation machinery.
///
/// The adapter decides how system/user/assistant messages are built, which
/// provider trait it talks to, and what the caller-visible output is.
#[async_trait]
pub trait ModalityAdapter: Send + Sync {
    type Params: Clone + Send + Sync;
    type Client: ProviderHandle + ?Sized;
    type Output: Send;

    /// Short modality name, used as the conversation-id prefix.
    fn kind(&self) -> &'static str;

    /// The default system prompt for a fresh conversation.
    fn system_prompt(&self, params: &Self::Params) -> String;

    /// Build user message content: a plain string without attachments,
    /// otherwise an ordered content-part list with the text part first.
    fn user_content(&self, prompt: &str, attachments: &[Attachment]) -> MessageContent {
        if attachments.is_empty() {
            return MessageContent::Text(prompt.to_string());
        }
        let mut parts = vec![ContentPart::Text {
            text: prompt.to_string(),
        }];
        parts.extend(attachments.iter().map(|attachment| ContentPart::ImageUrl {
            image_url: ImageRef {
                url: attachment.url.clone(),
            },
        }));
        MessageContent::Parts(parts)
    }

    /// Build the assistant message appended after a successful exchange.
    fn assistant_message(&self, output: &Self::Output) -> Message;

    /// Rebuild the assistant message for one rehydrated history entry. Must
    /// mirror `assistant_message` so rehydrated ordering matches live
    /// construction.
    fn replay_assistant(&self, entry: &HistoryEntry) -> Message {
        Message::assistant(entry.output.clone())
    }

    /// Turn ceiling, when the modality has one.
    fn max_turns(&self) -> Option<u32> {
        None
    }

    /// Perform the single provider call for this modality.
    async fn invoke(
        &self,
        client: &Self::Client,
        conversation: &Conversation<Self::Params>,
        options: &SendOptions,
    ) -> Result<Exchange<Self::Output>, ChatError>;

    /// Hook run against the conversation after the assistant turn is
    /// appended.
    fn after_exchange(&self, conversation: &mut Conversation<Self::Params>, output: &Self::Output) {
        let _ = (conversation, output);
    }
}

// ============================================================================
// Text
// ============================================================================

pub const DEFAULT_MAX_TURNS: u32 = 10;

const TEXT_SYSTEM_PROMPT: &str = "You are a helpful design assistant. Answer questions about \
graphics, layout, and visual design. Keep replies concise and concrete.";

/// Free-text conversations. The only modality with a turn ceiling.
pub struct TextModality {
    max_turns: u32,
}

impl TextModality {
    pub fn new(max_turns: u32) -> Self {
        Self { max_turns }
    }
}

impl Default for TextModality {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextParams {
    /// Replaces the default system prompt when set.
    pub system_prompt: Option<String>,
}

#[async_trait]
impl ModalityAdapter for TextModality {
    type Params = TextParams;
    type Client = dyn CompletionClient;
    type Output = String;

    fn kind(&self) -> &'static str {
        "text"
    }

    fn system_prompt(&self, params: &TextParams) -> String {
        params
            .system_prompt
            .clone()
            .unwrap_or_else(|| TEXT_SYSTEM_PROMPT.to_string())
    }

    fn assistant_message(&self, output: &String) -> Message {
        Message::assistant(output.clone())
    }

    fn max_turns(&self) -> Option<u32> {
        Some(self.max_turns)
    }

    async fn invoke(
        &self,
        client: &Self::Client,
        conversation: &Conversation<TextParams>,
        options: &SendOptions,
    ) -> Result<Exchange<String>, ChatError> {
        let completion = client
            .create_completion(&conversation.messages, &options.completion())
            .await?;
        Ok(Exchange {
            output: completion.content,
            usage: completion.usage,
        })
    }
}

// ============================================================================
// SVG
// ============================================================================

/// SVG markup conversations: a text completion with mandatory extraction.
pub struct SvgModality;

#[derive(Debug, Clone)]
pub struct SvgParams {
    pub width: u32,
    pub height: u32,
}

impl Default for SvgParams {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
        }
    }
}

/// The raw completion plus the SVG substring pulled out of it. The raw reply
/// is what lands in the conversation; the extracted SVG is what the caller
/// receives.
#[derive(Debug, Clone)]
pub struct SvgOutput {
    pub raw: String,
    pub svg: String,
}

#[async_trait]
impl ModalityAdapter for SvgModality {
    type Params = SvgParams;
    type Client = dyn CompletionClient;
    type Output = SvgOutput;

    fn kind(&self) -> &'static str {
        "svg"
    }

    fn system_prompt(&self, params: &SvgParams) -> String {
        format!(
            "You are an expert SVG illustrator. Respond with a single complete \
<svg> document for a {}x{} canvas, inside a fenced code block. \
Do not include any explanation outside the code block.",
            params.width, params.height
        )
    }

    fn assistant_message(&self, output: &SvgOutput) -> Message {
        Message::assistant(output.raw.clone())
    }

    async fn invoke(
        &self,
        client: &Self::Client,
        conversation: &Conversation<SvgParams>,
        options: &SendOptions,
    ) -> Result<Exchange<SvgOutput>, ChatError> {
        let completion = client
            .create_completion(&conversation.messages, &options.completion())
            .await?;
        let svg = extract_svg(&completion.content)?;
        Ok(Exchange {
            output: SvgOutput {
                raw: completion.content,
                svg,
            },
            usage: completion.usage,
        })
    }
}

// ============================================================================
// Image
// ============================================================================

/// Generated-image conversations.
pub struct ImageModality;

#[derive(Debug, Clone)]
pub struct ImageParams {
    pub aspect_ratio: String,
}

impl Default for ImageParams {
    fn default() -> Self {
        Self {
            aspect_ratio: "1:1".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageOutput {
    pub images: Vec<GeneratedImage>,
    /// Seed the batch was generated with, reused for continuation.
    pub seed: u64,
}

const IMAGE_SYSTEM_PROMPT: &str = "You are an image generation assistant. Produce images that \
match the user's description, refining the previous result on each follow-up turn.";

#[async_trait]
impl ModalityAdapter for ImageModality {
    type Params = ImageParams;
    type Client = dyn ImageClient;
    type Output = ImageOutput;

    fn kind(&self) -> &'static str {
        "image"
    }

    fn system_prompt(&self, _params: &ImageParams) -> String {
        IMAGE_SYSTEM_PROMPT.to_string()
    }

    fn assistant_message(&self, output: &ImageOutput) -> Message {
        Message::assistant_with_images(String::new(), output.images.clone())
    }

    fn replay_assistant(&self, entry: &HistoryEntry) -> Message {
        Message::assistant_with_images(entry.output.clone(), entry.images.clone())
    }

    async fn invoke(
        &self,
        client: &Self::Client,
        conversation: &Conversation<ImageParams>,
        options: &SendOptions,
    ) -> Result<Exchange<ImageOutput>, ChatError> {
        let request = ImageRequest {
            messages: conversation.messages.clone(),
            model: options
                .model
                .clone()
                .unwrap_or_else(|| conversation.model.clone()),
            aspect_ratio: conversation.params.aspect_ratio.clone(),
            seed: options.seed.or(conversation.last_seed),
        };
        let batch = client.generate_images(&request).await?;
        Ok(Exchange {
            output: ImageOutput {
                images: batch.images,
                seed: batch.seed,
            },
            usage: batch.usage,
        })
    }

    fn after_exchange(&self, conversation: &mut Conversation<ImageParams>, output: &ImageOutput) {
        conversation.last_seed = Some(output.seed);
    }
}
