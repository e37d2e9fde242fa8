//! Standalone HTML document shell around compiled body HTML.

use std::fmt::Write;

use jmd_config::DocumentConfig;
use jmd_renderer::{Metadata, escape_html};

const MATHJAX_CONFIG: &str = r"MathJax = {
  tex: {
    inlineMath: [['$', '$'], ['\\(', '\\)']],
    displayMath: [['$$', '$$'], ['\\[', '\\]']],
    tags: 'ams'
  }
};";
const MATHJAX_SRC: &str = "https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-svg.js";

/// Head and body settings for one output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Shell {
    pub title: String,
    pub lang: String,
    pub css: Vec<String>,
    pub scripts: Vec<String>,
    pub body_classes: Option<String>,
    pub mathjax: bool,
}

impl Shell {
    /// Merge configuration with front matter.
    ///
    /// Front matter wins for single values; stylesheets and scripts from
    /// both are kept, configuration first. `fallback_title` is used when
    /// neither names a title.
    pub(crate) fn resolve(config: &DocumentConfig, metadata: &Metadata, fallback_title: &str) -> Self {
        let title = metadata
            .title()
            .or(config.title.as_deref())
            .unwrap_or(fallback_title)
            .to_owned();
        let lang = metadata.lang().unwrap_or(&config.lang).to_owned();
        let body_classes = metadata
            .body_classes()
            .map(str::to_owned)
            .or_else(|| config.body_classes.clone());

        Self {
            title,
            lang,
            css: merge(&config.css, metadata.css()),
            scripts: merge(&config.scripts, metadata.scripts()),
            body_classes,
            mathjax: config.mathjax,
        }
    }

    /// Render a complete HTML page.
    pub(crate) fn render(&self, body: &str) -> String {
        let mut html = String::with_capacity(body.len() + 1024);

        let _ = writeln!(
            html,
            "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>",
            escape_html(&self.lang)
        );
        html.push_str("<meta charset=\"utf-8\">\n");
        html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
        let _ = writeln!(html, "<title>{}</title>", escape_html(&self.title));

        if self.mathjax {
            let _ = writeln!(html, "<script>\n{MATHJAX_CONFIG}\n</script>");
            let _ = writeln!(html, "<script src=\"{MATHJAX_SRC}\"></script>");
        }
        for href in &self.css {
            let _ = writeln!(html, "<link rel=\"stylesheet\" href=\"{}\">", escape_html(href));
        }
        for src in &self.scripts {
            let _ = writeln!(html, "<script src=\"{}\"></script>", escape_html(src));
        }
        html.push_str("</head>\n");

        match &self.body_classes {
            Some(classes) => {
                let _ = writeln!(html, "<body class=\"{}\">", escape_html(classes));
            }
            None => html.push_str("<body>\n"),
        }
        html.push_str(body);
        if !body.ends_with('\n') {
            html.push('\n');
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

fn merge(configured: &[String], declared: Vec<String>) -> Vec<String> {
    let mut merged = configured.to_vec();
    for item in declared {
        if !merged.contains(&item) {
            merged.push(item);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmd_renderer::split_front_matter;
    use pretty_assertions::assert_eq;

    fn metadata(front: &str) -> Metadata {
        split_front_matter(front).0
    }

    #[test]
    fn test_resolve_defaults() {
        let shell = Shell::resolve(&DocumentConfig::default(), &Metadata::default(), "notes");
        assert_eq!(shell.title, "notes");
        assert_eq!(shell.lang, "en");
        assert!(shell.css.is_empty());
        assert_eq!(shell.body_classes, None);
        assert!(shell.mathjax);
    }

    #[test]
    fn test_front_matter_overrides_config() {
        let config = DocumentConfig {
            lang: "en".to_owned(),
            title: Some("Configured".to_owned()),
            css: vec!["base.css".to_owned()],
            scripts: vec!["app.js".to_owned()],
            body_classes: Some("plain".to_owned()),
            mathjax: false,
        };
        let meta = metadata(
            "Title: Week 1\nLang: fr\nCSS: base.css\n  week.css\nBody classes: slides\n----\n",
        );

        let shell = Shell::resolve(&config, &meta, "notes");
        assert_eq!(shell.title, "Week 1");
        assert_eq!(shell.lang, "fr");
        assert_eq!(shell.css, vec!["base.css", "week.css"]);
        assert_eq!(shell.scripts, vec!["app.js"]);
        assert_eq!(shell.body_classes.as_deref(), Some("slides"));
        assert!(!shell.mathjax);
    }

    #[test]
    fn test_render_page() {
        let shell = Shell {
            title: "A < B".to_owned(),
            lang: "en".to_owned(),
            css: vec!["style.css".to_owned()],
            scripts: Vec::new(),
            body_classes: Some("wide".to_owned()),
            mathjax: false,
        };
        let html = shell.render("<p>Hi</p>\n");
        assert_eq!(
            html,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n\
             <meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
             <title>A &lt; B</title>\n\
             <link rel=\"stylesheet\" href=\"style.css\">\n\
             </head>\n<body class=\"wide\">\n<p>Hi</p>\n</body>\n</html>\n"
        );
    }

    #[test]
    fn test_render_mathjax() {
        let shell = Shell::resolve(&DocumentConfig::default(), &Metadata::default(), "t");
        let html = shell.render("");
        assert!(html.contains("MathJax = {"));
        assert!(html.contains(MATHJAX_SRC));
        assert!(html.contains("<body>\n\n</body>"));
    }
}
