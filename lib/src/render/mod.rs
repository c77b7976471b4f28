//! Render dispatch: turns a classified node into an HTML body.

mod convert;

pub use convert::*;

use std::fs;

use crate::driver::BuildContext;
use crate::error::{Chainable, Result};
use crate::node::{Kind, Node};
use crate::util::PathExt;

/// The product of rendering one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// A body that still needs the sitewide page template.
    Fragment(String),
    /// A complete document, written as-is.
    Page(String),
}

impl Node {
    /// Renders this node's body. Nothing is written; a failure here never
    /// leaves a partial output behind.
    pub fn render(&self, cx: &BuildContext<'_>) -> Result<Rendered> {
        let path = &self.entry().path;
        match self.kind() {
            Kind::Convertible(markup) => {
                let fragment = cx.converters.convert(markup, path)?;
                Ok(Rendered::Fragment(fragment))
            }
            Kind::Html => {
                let html = fs::read_to_string(path).chain_with(|| error! {
                    Render: "failed to read html source",
                    "path" => path.display(),
                })?;

                Ok(Rendered::Fragment(html))
            }
            Kind::Template => {
                let source = fs::read_to_string(path).chain_with(|| error! {
                    Render: "failed to read page template",
                    "path" => path.display(),
                })?;

                let name = self.entry().relative.to_slash();
                let page = cx.engine.render_template(&name, &source, &cx.page(self))
                    .chain_with(|| error! {
                        Render: "failed to render page template",
                        "path" => path.display(),
                    })?;

                Ok(Rendered::Page(page))
            }
            Kind::Raw | Kind::Directory => err! {
                Render: "node is not renderable",
                "path" => path.display(),
                "kind" => format!("{:?}", self.kind()),
            },
        }
    }
}
