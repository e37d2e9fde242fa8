//! Generic directives.
//!
//! Containers (`:::name{attrs}[header]` ... `:::`), blocks
//! (`::name{attrs}[text]`) and inline directives (`:name[text]{attrs}`) are
//! synthesized from declarative [`DirectiveSpec`]s.

mod content;
mod factory;
mod game;
mod presets;

pub use content::{ContentKind, ContentToken, collapse_attrs, lex_content};
pub use factory::{
    DirectiveRenderer, DirectiveSpec, DirectiveTokenizer, create_directive, create_directives,
    directive_type_name, is_void_element, render_directive,
};
pub use game::game_spec;
pub use presets::{
    CONTAINER_MARKERS, markdown_demo_specs, optional_specs, preset_specs, standard_specs,
};
