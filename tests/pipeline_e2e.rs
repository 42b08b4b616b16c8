use expertise_graph::{
    AdvisorRef, Category, EngineConfig, ExpertiseEngine, GraphSink, InMemoryGraphSink,
    MergeField, NodeId, NodeKind, PersonIndex, Relationship, SourceRow, TextIndex, WarningKind,
};

fn row(cells: [&str; 9]) -> SourceRow {
    SourceRow::from_fields(cells).unwrap()
}

fn engine() -> ExpertiseEngine {
    ExpertiseEngine::new(EngineConfig::default()).unwrap()
}

#[test]
fn single_row_end_to_end() {
    let mut engine = engine();
    engine
        .ingest(&row([
            "Dr. A B",
            "a@b.de",
            "x, y",
            "I / F / D",
            "Prof. C D",
            "Researcher, Professor",
            "p1,p2",
            "--",
            "",
        ]))
        .unwrap();

    let persons = engine.persons();
    assert_eq!(persons.len(), 1);
    assert_eq!(persons[0].title, "Dr.");
    assert_eq!(persons[0].name(), "A B");
    assert_eq!(persons[0].interests.len(), 2);
    assert_eq!(persons[0].roles.len(), 2);
    assert_eq!(persons[0].offered_expertise.len(), 2);
    assert!(persons[0].wanted_expertise.is_empty());

    let pools = engine.pools();
    assert_eq!(pools.pool(Category::Institute).len(), 1);
    assert_eq!(pools.pool(Category::Faculty).len(), 1);
    assert_eq!(pools.pool(Category::Department).len(), 1);
    assert_eq!(pools.mentions().len(), 1);
    assert_eq!(pools.get(Category::Institute, persons[0].institutes[0]), "I");
    assert_eq!(pools.get(Category::Faculty, persons[0].faculties[0]), "F");
    assert_eq!(pools.get(Category::Department, persons[0].departments[0]), "D");

    engine.resolve_advisors().unwrap();

    let persons = engine.persons();
    assert_eq!(persons.len(), 2);
    assert_eq!(persons[1].name(), "C D");
    assert_eq!(persons[1].title, "Prof.");
    assert!(persons[1].is_stub());
    assert_eq!(persons[0].advisors, vec![AdvisorRef::Person(PersonIndex::new(1))]);
}

#[test]
fn advisor_resolution_is_total() {
    let mut engine = engine();
    let report = engine
        .ingest_batch(vec![
            row(["A Smith", "a@x.de", "", "", "Prof. Dr. B Jones, C Miller", "", "", "", ""]),
            row(["Dr. B Jones", "b@x.de", "", "", "Dr., D Miller", "", "", "", ""]),
            row(["E Brown", "e@x.de", "", "", "F Green / G Green", "", "", "", ""]),
        ])
        .unwrap();
    assert!(report.is_clean());
    assert!(report
        .warnings
        .iter()
        .any(|w| w.row == 2 && matches!(w.kind, WarningKind::TitleOnlyAdvisor { .. })));

    let resolution = engine.resolve_advisors().unwrap();

    let persons = engine.persons();
    for person in persons {
        for advisor in &person.advisors {
            let target = advisor.as_person().expect("resolved");
            assert!(target.get() < persons.len());
        }
    }
    // Jones matched; C Miller and F Green synthesized; D Miller and G Green
    // collapse onto those stubs.
    assert_eq!(resolution.matched, 3);
    assert_eq!(resolution.synthesized.len(), 2);
    assert_eq!(persons[1].title, "Prof. Dr.");
    assert_eq!(persons[1].advisors, vec![AdvisorRef::Person(PersonIndex::new(3))]);
    assert_eq!(persons[2].advisors[0], persons[2].advisors[1]);
}

#[test]
fn merge_first_match_wins_across_persons() {
    let mut engine = engine();
    engine
        .ingest_batch(vec![
            row(["A B", "a@x.de", "Data Science", "", "", "", "", "", ""]),
            row(["C D", "c@x.de", "data science ", "", "", "", "", "", ""]),
            row(["E F", "e@x.de", "Statistics", "", "", "", "", "", ""]),
        ])
        .unwrap();
    engine.resolve_advisors().unwrap();

    let outcome = engine.merge_category(MergeField::Interests).unwrap();

    let persons = engine.persons();
    assert_eq!(persons[0].interests, vec![TextIndex::new(0)]);
    assert_eq!(persons[1].interests, vec![TextIndex::new(0)]);
    assert_eq!(persons[2].interests, vec![TextIndex::new(2)]);
    assert_eq!(outcome.canonical, vec![TextIndex::new(0), TextIndex::new(2)]);
    assert_eq!(engine.pools().get(Category::Interest, TextIndex::new(1)), "data science");

    let again = engine.merge_category(MergeField::Interests).unwrap();
    assert_eq!(again.canonical, outcome.canonical);
    assert_eq!(again.rewritten, 0);
}

#[test]
fn export_builds_typed_graph() {
    let mut engine = engine();
    engine
        .ingest_batch(vec![
            row([
                "Dr. A B",
                "a@x.de",
                "Robotics",
                "TU X / CS / ZIH",
                "Prof. C D",
                "Researcher",
                "Rust",
                "Haskell",
                "",
            ]),
            row([
                "E F",
                "e@x.de",
                "robotics",
                "TU X / CS",
                "",
                "Researcher",
                "",
                "rust",
                "",
            ]),
        ])
        .unwrap();
    let sink = InMemoryGraphSink::new();
    let summary = engine.finish(&sink).unwrap();

    assert_eq!(summary.export.persons, 3);
    assert_eq!(sink.nodes_of_kind(NodeKind::Person).unwrap().len(), 3);
    assert_eq!(sink.nodes_of_kind(NodeKind::ResearchInterest).unwrap().len(), 1);
    assert_eq!(sink.nodes_of_kind(NodeKind::Institute).unwrap().len(), 1);
    // "Rust" offered and "rust" wanted merge in separate passes, so both survive.
    let expertise: Vec<String> = sink
        .nodes_of_kind(NodeKind::Expertise)
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(expertise, vec!["Haskell", "Rust", "rust"]);

    let a = NodeId::derive(NodeKind::Person, "A B");
    let edges = sink.edges_from(a).unwrap();
    let advised: Vec<_> = edges
        .iter()
        .filter(|e| e.relationship == Relationship::AdvisedBy)
        .collect();
    assert_eq!(advised.len(), 1);
    assert_eq!(advised[0].to, NodeId::derive(NodeKind::Person, "C D"));

    let e = NodeId::derive(NodeKind::Person, "E F");
    let interest = sink.get_or_create_entity(NodeKind::ResearchInterest, "Robotics").unwrap();
    assert!(sink
        .edges_from(e)
        .unwrap()
        .iter()
        .any(|edge| edge.to == interest && edge.relationship == Relationship::Has));

    let stub = sink.find(NodeKind::Person, "C D").unwrap().unwrap();
    let attributes = stub.attributes.unwrap();
    assert_eq!(attributes.title, "Prof.");
    assert_eq!(attributes.email, None);
}

#[test]
fn snapshot_digest_is_reproducible() {
    let rows = || {
        vec![
            row(["Dr. A B", "a@x.de", "x; y", "I / F", "C D", "R", "p", "q", ""]),
            row(["G H", "g@x.de", "X", "I", "A B", "R", "", "p", ""]),
        ]
    };

    let digest = || {
        let mut engine = engine();
        engine.ingest_batch(rows()).unwrap();
        let sink = InMemoryGraphSink::new();
        engine.finish(&sink).unwrap();
        sink.snapshot().unwrap().digest().unwrap()
    };

    assert_eq!(digest(), digest());
}
