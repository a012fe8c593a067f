//! Graphviz output of a single replay frame.

use std::io::Write;

use crate::{
    frame::Frame,
    op::partial,
    sweep::Sweep,
    tensor::Tensor,
    term::{Category, Term},
};

const VARIABLE_COLOR: &str = "lightblue";
const CONSTANT_COLOR: &str = "orange";
const OPERATION_COLOR: &str = "#d5a6f9";
const ACTIVE_COLOR: &str = "#45a325";

/// Writes frames of a replay over the graph described by `sweep`.
pub struct FrameDotBuilder<'a, T> {
    sweep: &'a Sweep<T>,
    precision: usize,
    show_values: bool,
}

impl<'a, T: Tensor> FrameDotBuilder<'a, T> {
    pub fn new(sweep: &'a Sweep<T>) -> Self {
        Self {
            sweep,
            precision: 4,
            show_values: false,
        }
    }

    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision.max(1);
        self
    }

    /// Print each node's forward value under its name.
    pub fn show_values(mut self, show_values: bool) -> Self {
        self.show_values = show_values;
        self
    }

    /// Write graphviz dot file for `frame` to the given writer.
    pub fn dot(&self, frame: &Frame<T>, writer: &mut impl Write) -> std::io::Result<()> {
        writeln!(writer, "digraph G {{\nrankdir=\"LR\";")?;
        for node in self.sweep.nodes() {
            let (border, width) = if node.id() == frame.node {
                (ACTIVE_COLOR, 5)
            } else {
                ("black", 1)
            };
            writeln!(
                writer,
                "{} [label=\"{}\", style=filled, fillcolor=\"{}\", color=\"{}\", penwidth={}];",
                node.id(),
                escape(&self.node_label(node, frame)),
                fill_color(node),
                border,
                width
            )?;
        }
        for edge in self.sweep.edges() {
            let highlighted = frame.edge == Some(*edge);
            let (color, width) = if highlighted {
                (ACTIVE_COLOR, 5)
            } else {
                ("black", 1)
            };
            write!(
                writer,
                "{} -> {} [color=\"{}\", penwidth={}",
                edge.operand, edge.consumer, color, width
            )?;
            if let Some(label) = frame.edge_label(*edge) {
                let text = label
                    .local
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |local| local.short(self.precision));
                write!(writer, ", label=\"{}\"", escape(&text))?;
            }
            writeln!(writer, "];")?;
        }
        writeln!(writer, "}}")?;
        Ok(())
    }

    fn node_label(&self, node: &Term<T>, frame: &Frame<T>) -> String {
        let mut label = node.name().to_string();
        if self.show_values {
            label += &format!("\ndata: {}", node.value().short(self.precision));
        }
        if node.category() == Category::Variable {
            if let Some(adjoint) = frame
                .variable_adjoints
                .iter()
                .find(|var| var.node == node.id())
            {
                label += &format!(
                    "\n{} = {}",
                    partial("f", node.name()),
                    adjoint.adjoint.short(self.precision)
                );
            }
        }
        label
    }
}

fn fill_color<T: Tensor>(node: &Term<T>) -> &'static str {
    match node.category() {
        Category::Variable => VARIABLE_COLOR,
        Category::Constant => CONSTANT_COLOR,
        Category::Operation => OPERATION_COLOR,
    }
}

fn escape(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::walker::Walker;

    #[test]
    fn highlights_current_edge() {
        let a = Term::variable("a", 2.);
        let b = Term::variable("b", 3.);
        let f = &a * &b;
        let mut walker = Walker::new(&f);
        let frame = walker.tick().unwrap();

        let mut buf = vec![];
        FrameDotBuilder::new(walker.sweep())
            .dot(&frame, &mut buf)
            .unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("digraph G {\nrankdir=\"LR\";\n"));
        assert!(text.contains(&format!(
            "{} -> {} [color=\"#45a325\", penwidth=5, label=\"3\"];",
            a.id(),
            f.id()
        )));
        assert!(text.contains(&format!(
            "{} -> {} [color=\"black\", penwidth=1, label=\"-\"];",
            b.id(),
            f.id()
        )));
        assert!(text.contains(&format!(
            "{} [label=\"(a * b)\", style=filled, fillcolor=\"#d5a6f9\", color=\"#45a325\", penwidth=5];",
            f.id()
        )));
        assert!(text.trim_end().ends_with('}'));
    }

    fn render(builder: FrameDotBuilder<'_, f64>, frame: &Frame<f64>) -> String {
        let mut buf = vec![];
        builder.dot(frame, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn values_only_when_asked() {
        let x = Term::variable("x", 1.25);
        let f = x.exp();
        let mut walker = Walker::new(&f);
        let frame = walker.tick().unwrap();

        let plain = render(FrameDotBuilder::new(walker.sweep()), &frame);
        assert!(!plain.contains("data:"));

        let with_values = render(
            FrameDotBuilder::new(walker.sweep()).show_values(true),
            &frame,
        );
        assert!(with_values.contains(&format!("{} [label=\"x\\ndata: 1.25\\n", x.id())));
        assert!(with_values.contains("exp(x)\\ndata: 3.49"));
    }
}
