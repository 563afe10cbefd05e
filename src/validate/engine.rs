use super::report::{Entry, ErrorReport};
use crate::config::Config;
use crate::constants::validation;
use crate::dtype::DType;
use crate::node::{NodeId, NodeKind};
use crate::registry::{self, Call, CheckOutcome, NodeRef, Subject};
use log::{debug, trace};

/// Validates the whole configuration.
pub fn validate(config: &Config, strict: bool) -> ErrorReport {
    validate_node(config, config.root(), strict)
}

/// Validates one node and everything below it.
///
/// `strict` also validates nodes the definitions synthesised.
pub fn validate_node(config: &Config, id: NodeId, strict: bool) -> ErrorReport {
    let node = &config.tree()[id];
    let strict = strict || node.meta.strict || node.options.strict;
    match node.kind {
        NodeKind::Scalar(_) => validate_scalar(config, id, strict),
        NodeKind::Dict(_) | NodeKind::List(_) => validate_container(config, id, strict),
    }
}

fn required(report: &mut ErrorReport) {
    report.insert(validation::REQUIRED_KEY, Entry::Message(validation::REQUIRED.to_string()));
}

fn validate_scalar(config: &Config, id: NodeId, strict: bool) -> ErrorReport {
    let tree = config.tree();
    let meta = &tree[id].meta;
    let mut report = ErrorReport::new();

    if meta.missing && !strict {
        if meta.required {
            required(&mut report);
        }
        trace!("{:?} is missing, skipping its checks", tree.name(id));
        return report;
    }

    let node = NodeRef::new(config, id);
    let value = node.value();
    if value.is_nothing() && meta.required {
        required(&mut report);
    }

    let dtype = meta.dtype_for(value);
    let outcome = if dtype.istype(value) {
        CheckOutcome::Pass
    } else {
        CheckOutcome::Fail(format!(
            "Wrong type: Expected {:?}, got {} ({value})",
            dtype.label(),
            value.type_label()
        ))
    };
    report.record(validation::TYPE_KEY, outcome);

    for spec in meta.checks_for(value) {
        debug!("Running check {} on {:?}", spec.name, node.name());
        let call = Call::new(Subject::Node(node.clone()))
            .with_args(spec.args.clone())
            .with_kwargs(spec.kwargs.clone());
        report.record(spec.name.clone(), registry::check(&spec.name, &call));
    }
    report
}

fn validate_container(config: &Config, id: NodeId, strict: bool) -> ErrorReport {
    let tree = config.tree();
    let node = &tree[id];
    let mut report = ErrorReport::new();

    if node.meta.missing && node.meta.required && !strict {
        required(&mut report);
    }

    let shape = match node.kind {
        NodeKind::Dict(_) => DType::Dict,
        _ => DType::List,
    };
    if !node.meta.dtype.is_any() && !node.meta.dtype.dtypes().contains(&shape) {
        report.record(
            validation::TYPE_KEY,
            CheckOutcome::Fail(format!(
                "Wrong type: Expected {:?}, got {}",
                node.meta.dtype.label(),
                shape.label()
            )),
        );
    }

    let children = tree.children(id);
    for spec in &node.meta.checks {
        for tag in spec.tags() {
            let tagged: Vec<NodeRef<'_>> = children
                .iter()
                .filter(|child| tree[**child].meta.has_tag(&tag))
                .map(|child| NodeRef::new(config, *child))
                .collect();
            debug!("Running group check {}[{tag}] over {} nodes", spec.name, tagged.len());
            let call = Call::new(Subject::Nodes(tagged)).with_kwargs(spec.kwargs.clone());
            report.record(format!("{}[{tag}]", spec.name), registry::check(&spec.name, &call));
        }
    }

    for child in children {
        report.nest(tree.name(child), validate_node(config, child, strict));
    }
    report
}
