//! Process-wide Handlebars registry and the bounded multi-pass renderer.

use handlebars::{
    Context, Handlebars, Helper, HelperResult, JsonRender, Output, RenderContext,
    RenderErrorReason,
};
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::debug;

use super::TemplateError;

/// Marker whose presence in rendered text triggers another pass.
const OPEN_MARKER: &str = "{{";
const CLOSE_MARKER: &str = "}}";

static REGISTRY: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut registry = Handlebars::new();
    registry.register_escape_fn(handlebars::no_escape);
    registry.register_helper("render_template", Box::new(render_template_helper));
    registry
});

/// Options controlling how a template is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Upper bound on substitution passes, counting the first one.
    ///
    /// A value of zero behaves like one.
    pub max_passes: usize,
}

impl RenderOptions {
    pub fn with_max_passes(max_passes: usize) -> Self {
        Self { max_passes }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { max_passes: 3 }
    }
}

/// `{{render_template snippet}}` renders the string held by `snippet` against
/// the bindings currently in scope.
fn render_template_helper(
    h: &Helper,
    r: &Handlebars,
    ctx: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param = h
        .param(0)
        .ok_or(RenderErrorReason::ParamNotFoundForIndex("render_template", 0))?;
    let source = param.value().render();
    let rendered = r.render_template_with_context(&source, ctx)?;
    out.write(&rendered)?;
    Ok(())
}

/// Renders `source` against `bindings`, re-rendering while the output still
/// contains template markers, up to `options.max_passes` passes in total.
///
/// Only the first pass may fail. If a later pass cannot be rendered, or the
/// text it would render holds an unclosed tag, the output of the previous
/// pass is returned as-is.
pub(crate) fn render<T: Serialize + ?Sized>(
    source: &str,
    bindings: &T,
    options: &RenderOptions,
) -> Result<String, TemplateError> {
    let context = Context::wraps(bindings)?;
    let mut output = REGISTRY.render_template_with_context(source, &context)?;

    for pass in 2..=options.max_passes.max(1) {
        if !output.contains(OPEN_MARKER) {
            break;
        }
        if has_unclosed_tag(&output) {
            debug!(pass, "stopping template rendering early: unclosed tag");
            break;
        }
        match REGISTRY.render_template_with_context(&output, &context) {
            Ok(next) => output = next,
            Err(e) => {
                debug!(pass, error = %e, "stopping template rendering early");
                break;
            }
        }
    }

    Ok(output)
}

/// True if some `{{` in `text` is never followed by a matching `}}`.
fn has_unclosed_tag(text: &str) -> bool {
    let mut rest = text;
    while let Some(start) = rest.find(OPEN_MARKER) {
        let after = &rest[start + OPEN_MARKER.len()..];
        match after.find(CLOSE_MARKER) {
            Some(end) => rest = &after[end + CLOSE_MARKER.len()..],
            None => return true,
        }
    }
    false
}
