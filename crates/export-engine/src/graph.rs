//! Typed filter-graph builder.
//!
//! Filter chains are assembled as typed stage records and serialized to the
//! encoder's textual grammar only at the very end: stages are `;`-joined,
//! `[label]` input/output references are bracket-delimited, and parameters
//! are `key=value` pairs joined by `:`.
//!
//! Label naming must be collision-free across one compiled export. The
//! synthetic families `scaled{i}`, `rotated{i}`, `alpha{i}`, and `v{i}`
//! (1-based) are reserved for the overlay compilers.

/// One argument of a filter call.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterArg {
    /// Positional value (`scale=200:150`).
    Pos(String),

    /// Keyed value (`overlay=x=100:y=200`).
    Kv(String, String),
}

/// A single filter invocation within a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    name: String,
    args: Vec<FilterArg>,
}

impl FilterCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Append a positional argument. Values are inserted verbatim; escaping
    /// is the caller's concern.
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(FilterArg::Pos(value.into()));
        self
    }

    /// Append a `key=value` argument. Values are inserted verbatim.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push(FilterArg::Kv(key.into(), value.into()));
        self
    }

    fn render(&self, out: &mut String) {
        out.push_str(&self.name);
        if self.args.is_empty() {
            return;
        }
        out.push('=');
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                out.push(':');
            }
            match arg {
                FilterArg::Pos(value) => out.push_str(value),
                FilterArg::Kv(key, value) => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                }
            }
        }
    }
}

/// One stage: input labels, a comma-chained filter sequence, output labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterStage {
    inputs: Vec<String>,
    calls: Vec<FilterCall>,
    outputs: Vec<String>,
}

impl FilterStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, label: impl Into<String>) -> Self {
        self.inputs.push(label.into());
        self
    }

    pub fn call(mut self, call: FilterCall) -> Self {
        self.calls.push(call);
        self
    }

    pub fn output(mut self, label: impl Into<String>) -> Self {
        self.outputs.push(label.into());
        self
    }

    fn render(&self, out: &mut String) {
        for label in &self.inputs {
            out.push('[');
            out.push_str(label);
            out.push(']');
        }
        for (i, call) in self.calls.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            call.render(out);
        }
        for label in &self.outputs {
            out.push('[');
            out.push_str(label);
            out.push(']');
        }
    }
}

/// An ordered sequence of stages, serialized with `;` separators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    stages: Vec<FilterStage>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: FilterStage) {
        self.stages.push(stage);
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Serialize to filter-graph text. An empty graph renders as the empty
    /// string, which downstream treats as a no-op chain.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            stage.render(&mut out);
        }
        out
    }
}

/// Format a numeric parameter the way the chains expect: integral values
/// without a decimal point, fractional values with trailing zeros trimmed.
pub fn format_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        let mut s = format!("{value:.4}");
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_with_positional_args() {
        let mut graph = FilterGraph::new();
        graph.push(
            FilterStage::new()
                .input("1:v")
                .call(FilterCall::new("scale").arg("200").arg("150"))
                .output("scaled1"),
        );
        assert_eq!(graph.render(), "[1:v]scale=200:150[scaled1]");
    }

    #[test]
    fn test_stage_with_keyed_args_and_chained_calls() {
        let mut graph = FilterGraph::new();
        graph.push(
            FilterStage::new()
                .input("0:v")
                .input("alpha1")
                .call(
                    FilterCall::new("overlay")
                        .param("x", "100")
                        .param("y", "200"),
                )
                .output("v1"),
        );
        graph.push(
            FilterStage::new()
                .input("v1")
                .call(FilterCall::new("format").arg("rgba"))
                .call(FilterCall::new("null")),
        );
        assert_eq!(
            graph.render(),
            "[0:v][alpha1]overlay=x=100:y=200[v1];[v1]format=rgba,null"
        );
    }

    #[test]
    fn test_empty_graph_renders_empty_string() {
        assert_eq!(FilterGraph::new().render(), "");
        assert!(FilterGraph::new().is_empty());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(8.0), "8");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1.25), "1.25");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.1047), "0.1047");
    }
}
