//! Custom tracing layers

use tracing::{Subscriber, span};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::context::{ParticipantContextData, ParticipantContextGuard};

/// Attaches the active participant context to every new span.
///
/// Spans opened while a [`ParticipantContextGuard`] is alive carry a
/// [`ParticipantContextExtension`]. Work that later runs inside the span on
/// another thread (a spawned engine driver, say) keeps its participant.
#[derive(Debug, Default)]
pub struct ParticipantContextLayer;

impl ParticipantContextLayer {
    pub fn new() -> Self {
        Self
    }
}

/// Extension data stored on spans
#[derive(Debug, Clone)]
pub struct ParticipantContextExtension {
    pub data: ParticipantContextData,
}

impl<S> Layer<S> for ParticipantContextLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, _attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        // Explicit context wins; otherwise inherit from the parent span
        let data = ParticipantContextGuard::current().or_else(|| {
            span.parent().and_then(|parent| {
                parent
                    .extensions()
                    .get::<ParticipantContextExtension>()
                    .map(|ext| ext.data.clone())
            })
        });

        if let Some(data) = data {
            span.extensions_mut().insert(ParticipantContextExtension { data });
        }
    }
}
