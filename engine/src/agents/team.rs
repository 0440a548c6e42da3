use super::entry::AgentEntry;

/// The static in-process team of thirteen specialists spanning strategy,
/// design, build, and ship (spec.md §1, §4.4). Exact membership is an
/// implementation decision spec.md leaves open beyond naming `ProductManager`,
/// `Builder`, `Security`, `Designer`, and `SRE` as examples (§4.1, §4.4, S4);
/// the remaining eight fill out the four named categories. Prompt text is
/// opaque data, not logic — these are placeholders an operator overrides.
pub fn builtin_team() -> Vec<AgentEntry> {
    vec![
        // strategy
        AgentEntry::new(
            "ProductManager",
            "Clarifies requirements, writes the PRD, and owns the supervisor role in hierarchical mode.",
            "You are the product manager. Turn the user's request into a clear PRD artifact.",
            "gpt-4o",
        ),
        AgentEntry::new(
            "Strategist",
            "Assesses market fit, prioritization, and tradeoffs ahead of execution.",
            "You are the strategist. Evaluate priorities and tradeoffs for the request.",
            "gpt-4o",
        ),
        AgentEntry::new(
            "Analyst",
            "Digs into data and metrics to ground decisions in evidence.",
            "You are the analyst. Surface the data relevant to this request.",
            "gpt-4o-mini",
        ),
        // design
        AgentEntry::new(
            "Designer",
            "Produces UX flows and interface direction.",
            "You are the designer. Propose a user experience for this request.",
            "gpt-4o",
        ),
        AgentEntry::new(
            "Architect",
            "Produces the technical plan artifact: system shape, interfaces, data flow.",
            "You are the architect. Write a TechPlan artifact for this request.",
            "gpt-4o",
        ),
        AgentEntry::new(
            "UXResearcher",
            "Validates design direction against user needs.",
            "You are the UX researcher. Critique the proposed design from a user's perspective.",
            "gpt-4o-mini",
        ),
        // build
        AgentEntry::new(
            "Builder",
            "Implements the change. The only node with a self-loop edge: it may retry itself up to the per-agent ceiling before surrendering to the Router.",
            "You are the builder. Implement the change described in the plan.",
            "gpt-4o",
        ),
        AgentEntry::new(
            "Security",
            "Reviews the implementation for vulnerabilities and produces a SecurityReview artifact.",
            "You are the security reviewer. Assess this change for vulnerabilities.",
            "gpt-4o",
        ),
        AgentEntry::new(
            "QA",
            "Writes and runs tests, producing a TestPlan artifact and a CodeReview artifact.",
            "You are QA. Write a test plan and review the implementation.",
            "gpt-4o",
        ),
        AgentEntry::new(
            "DataEngineer",
            "Handles data pipeline and schema concerns for the change.",
            "You are the data engineer. Address data plumbing for this request.",
            "gpt-4o-mini",
        ),
        // ship
        AgentEntry::new(
            "SRE",
            "Plans deployment, rollout, and rollback for the change.",
            "You are the SRE. Plan the deployment of this change.",
            "gpt-4o",
        ),
        AgentEntry::new(
            "DevOps",
            "Wires CI/CD and infrastructure changes needed to ship.",
            "You are DevOps. Describe the CI/CD and infrastructure changes needed.",
            "gpt-4o-mini",
        ),
        AgentEntry::new(
            "TechnicalWriter",
            "Writes release notes and user-facing documentation.",
            "You are the technical writer. Document this change for users.",
            "gpt-4o-mini",
        ),
    ]
}
