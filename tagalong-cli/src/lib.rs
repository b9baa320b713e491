use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use tagalong_core::{Scope, Value};
use tagalong_dom::Document;
use tagalong_template::{CompileOptions, Template};

/// Inputs of `tagalong render`.
#[derive(Debug, Clone, Default)]
pub struct RenderArgs {
    pub template: PathBuf,
    pub data: Option<PathBuf>,
    pub scope: Option<PathBuf>,
    pub selector: Option<String>,
    pub options: CompileOptions,
}

/// Read a JSON file into a template value.
pub fn read_json(path: &Path) -> Result<Value> {
    let src = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&src).with_context(|| format!("invalid JSON in {}", path.display()))?;
    Ok(Value::from(json))
}

/// Compile options from an optional JSON config file, then the command line
/// overrides on top.
pub fn load_options(config: Option<&Path>, prefix: Option<&str>, preserve: bool) -> Result<CompileOptions> {
    let mut options = match config {
        Some(path) => {
            let src = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&src).with_context(|| format!("invalid config in {}", path.display()))?
        }
        None => CompileOptions::default(),
    };
    if let Some(prefix) = prefix {
        options.prefix = prefix.to_string();
    }
    options.preserve_directives |= preserve;
    tracing::debug!(?options, "compile options");
    Ok(options)
}

/// Render a template file and return the resulting markup. With a selector
/// only the matched node is rendered; the whole document is returned.
pub fn render_cmd(args: &RenderArgs) -> Result<String> {
    let markup = fs::read_to_string(&args.template)
        .with_context(|| format!("failed to read {}", args.template.display()))?;
    let data = match &args.data {
        Some(path) => read_json(path)?,
        None => Value::Undefined,
    };
    let scope = match &args.scope {
        Some(path) => Scope::new(read_json(path)?),
        None => Scope::default(),
    };

    let mut doc = Document::parse(&markup);
    let root = doc.root();
    let target = match &args.selector {
        Some(selector) => match doc.select(selector) {
            Some(node) => node,
            None => bail!("no node matches {selector:?} in {}", args.template.display()),
        },
        None => root,
    };

    let mut render = tagalong_renderer::compile_with(&doc, target, args.options.clone())
        .with_context(|| format!("failed to compile {}", args.template.display()))?;
    render.render(&mut doc, target, &data, &scope);
    tracing::info!(template = %args.template.display(), nodes = doc.descendants(root).len(), "rendered");
    Ok(doc.inner_html(root))
}

/// Compile a template file without rendering it.
pub fn check_cmd(template: &Path, options: CompileOptions) -> Result<()> {
    let markup =
        fs::read_to_string(template).with_context(|| format!("failed to read {}", template.display()))?;
    let doc = Document::parse(&markup);
    Template::from_live(&doc, doc.root(), options)
        .with_context(|| format!("{} does not compile", template.display()))?;
    Ok(())
}
