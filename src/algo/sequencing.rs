use crate::core::Problem;
use crate::model::{eq, geq, leq, Assignment, Model};
use ahash::{HashMap, HashMapExt};
use good_lp::{Expression, Variable};

/// A node of the precedence graph: a job, or one of the virtual line endpoints.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Node {
    Start,
    Job(usize),
    End,
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "s"),
            Self::Job(i) => write!(f, "{i}"),
            Self::End => write!(f, "e"),
        }
    }
}

/// Variables of the job ordering and line assignment sub-model.
#[derive(Clone, Debug)]
pub struct Sequencing {
    /// `precedes[(i, j)]`: `j` immediately follows `i`. Self loops and edges
    /// into the start or out of the end node do not exist.
    pub precedes: HashMap<(Node, Node), Variable>,
    /// `on_line[l][i]`: job `i` runs on line `l`.
    pub on_line: Vec<Vec<Variable>>,
    /// `starts_line[l][i]`: job `i` is the first job of line `l`.
    pub starts_line: Vec<Vec<Variable>>,
    /// Position of each job along its line, used to cut sub-tours.
    pub rank: Vec<Variable>,
}

impl Sequencing {
    /// Returns the node following `from` under the given assignment.
    #[must_use]
    pub fn successor(&self, assignment: &Assignment, from: Node, jobs: usize) -> Option<Node> {
        (0..jobs)
            .map(Node::Job)
            .chain(std::iter::once(Node::End))
            .find(|&to| {
                self.precedes
                    .get(&(from, to))
                    .is_some_and(|&var| assignment.is_set(var))
            })
    }
}

/// Adds the sequencing sub-model: one path per line from the virtual start to
/// the virtual end covering every job once, with line membership inherited
/// along the path and start times ordered along chosen edges.
///
/// Timing rows only exclude cycles of jobs with positive processing time, so
/// MTZ rank rows `rank[j] ≥ rank[i] + 1 − n·(1 − precedes[i,j])` are added to
/// cut sub-tours of zero-duration jobs too.
pub fn add_sequencing(
    model: &mut Model,
    problem: &Problem,
    start: &[Variable],
    lines: usize,
) -> Sequencing {
    let n = start.len();
    let big_m = problem.big_m();

    let precedes = precedence_vars(model, n);
    let on_line = line_vars(model, "on_line", lines, n);
    let starts_line = line_vars(model, "starts_line", lines, n);

    #[allow(clippy::cast_precision_loss)]
    let jobs = n as f64;
    let rank: Vec<_> = (0..n)
        .map(|i| model.add_continuous(format!("rank_{i}"), 1.0, Some(jobs)))
        .collect();

    let incoming = |j: usize| -> Expression {
        std::iter::once(Node::Start)
            .chain((0..n).map(Node::Job))
            .filter_map(|i| precedes.get(&(i, Node::Job(j))).copied())
            .sum()
    };
    let outgoing = |i: usize| -> Expression {
        (0..n)
            .map(Node::Job)
            .chain(std::iter::once(Node::End))
            .filter_map(|j| precedes.get(&(Node::Job(i), j)).copied())
            .sum()
    };

    #[allow(clippy::cast_precision_loss)]
    let line_count = lines as f64;

    for i in 0..n {
        model.add_constr(format!("in_{i}"), eq(incoming(i), 1.0));
        model.add_constr(format!("out_{i}"), eq(outgoing(i), 1.0));
        model.add_constr(format!("balance_{i}"), eq(incoming(i), outgoing(i)));
    }

    let from_start: Expression = (0..n).map(|j| precedes[&(Node::Start, Node::Job(j))]).sum();
    model.add_constr("start_degree".into(), eq(from_start, line_count));
    let into_end: Expression = (0..n).map(|i| precedes[&(Node::Job(i), Node::End)]).sum();
    model.add_constr("end_degree".into(), eq(into_end, line_count));

    for (l, (starts, members)) in starts_line.iter().zip(&on_line).enumerate() {
        model.add_constr(
            format!("line_start_{l}"),
            eq(starts.iter().copied().sum::<Expression>(), 1.0),
        );
        for (i, (&first, &member)) in starts.iter().zip(members).enumerate() {
            model.add_constr(format!("first_member_{l}_{i}"), leq(first, member));
        }
    }

    for i in 0..n {
        let first: Expression = starts_line.iter().map(|starts| starts[i]).sum();
        let follows_start = precedes[&(Node::Start, Node::Job(i))];
        model.add_constr(format!("first_{i}"), eq(first, follows_start));

        let lines_of: Expression = on_line.iter().map(|members| members[i]).sum();
        model.add_constr(format!("assign_{i}"), eq(lines_of, 1.0));
    }

    let processing: Vec<_> = problem.products().iter().map(|p| p.processing_time).collect();
    for i in 0..n {
        for j in (0..n).filter(|&j| j != i) {
            let edge = precedes[&(Node::Job(i), Node::Job(j))];

            for (l, members) in on_line.iter().enumerate() {
                model.add_constr(
                    format!("inherit_{l}_{i}_{j}"),
                    geq(members[j], edge + members[i] - 1.0),
                );
            }

            model.add_constr(
                format!("order_{i}_{j}"),
                geq(start[j], start[i] + processing[i] - big_m * (1.0 - edge)),
            );
            model.add_constr(
                format!("rank_{i}_{j}"),
                geq(rank[j], rank[i] + 1.0 - jobs * (1.0 - edge)),
            );
        }
    }

    Sequencing {
        precedes,
        on_line,
        starts_line,
        rank,
    }
}

fn precedence_vars(model: &mut Model, n: usize) -> HashMap<(Node, Node), Variable> {
    let sources = std::iter::once(Node::Start).chain((0..n).map(Node::Job));
    let mut precedes = HashMap::with_capacity((n + 1) * (n + 1));
    for from in sources {
        let targets = (0..n).map(Node::Job).chain(std::iter::once(Node::End));
        for to in targets.filter(|&to| to != from) {
            // An empty line would need this edge; every line has a first job instead.
            if from == Node::Start && to == Node::End {
                continue;
            }
            let var = model.add_binary(format!("precedes_{from}_{to}"));
            precedes.insert((from, to), var);
        }
    }
    precedes
}

fn line_vars(model: &mut Model, name: &str, lines: usize, n: usize) -> Vec<Vec<Variable>> {
    let mut vars = vec![Vec::with_capacity(n); lines];
    for (l, line) in vars.iter_mut().enumerate() {
        for i in 0..n {
            line.push(model.add_binary(format!("{name}_{l}_{i}")));
        }
    }
    vars
}
