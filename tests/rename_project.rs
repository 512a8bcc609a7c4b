mod common;

use common::{no_backup, read, shop_project, snapshot, write, Layout};
use pbip_refactor::refactor::{batch_rename, validate, RenameOperation, ValidationCategory};
use pbip_refactor::{Project, ReportFormat, SessionState};

#[test]
fn table_rename_reaches_every_reference_position() {
    let dir = tempfile::tempdir().unwrap();
    let root = shop_project(dir.path(), Layout::Legacy);
    let project = Project::load(&root).unwrap();
    assert_eq!(project.report_format(), ReportFormat::Legacy);
    assert_eq!(project.linguistic_schema_files.len(), 1);

    let result = batch_rename(
        &project,
        &mut SessionState::new(),
        &[RenameOperation::table("Sales Data", "Revenue")],
        &no_backup(),
        false,
    )
    .unwrap();

    assert!(result.success, "{:?}", result.validation_errors);
    for (file, content) in snapshot(&root) {
        assert!(
            !content.contains("Sales Data"),
            "{} still mentions the old name:\n{}",
            file,
            content
        );
    }

    let sales = read(&root, "Shop.SemanticModel/definition/tables/Sales Data.tmdl");
    assert!(sales.starts_with("table Revenue\n"));
    assert!(sales.contains("measure 'Total Amount' = SUM(Revenue[Amount])"));
    assert!(sales.contains("measure 'Row Count' = COUNTROWS(Revenue)"));
    assert!(sales.contains("partition Revenue = m"));

    let relationships = read(&root, "Shop.SemanticModel/definition/relationships.tmdl");
    assert_eq!(
        relationships,
        "relationship 'Revenue to Customers'\n\tfromTable: Revenue\n\tfromColumn: Revenue.CustomerKey\n\ttoTable: Customers\n\ttoColumn: Customers.CustomerKey\n"
    );

    let model = read(&root, "Shop.SemanticModel/definition/model.tmdl");
    assert!(model.contains("annotation PBI_QueryOrder = [\"Revenue\",\"Customers\"]"));
    assert!(model.contains("ref table Revenue\n"));

    let report = read(&root, "Shop.Report/report.json");
    assert!(report.contains(r#"\"Entity\":\"Revenue\""#));
    assert!(report.contains(r#"\"Name\":\"Revenue.Amount\""#));

    assert!(read(&root, "Shop.SemanticModel/diagramLayout.json")
        .contains(r#""nodeIndex": "Revenue""#));
    assert!(read(&root, "Shop.SemanticModel/definition/cultures/en-US.tmdl")
        .contains(r#""ConceptualEntity": "Revenue""#));

    // Customers-only files are untouched.
    assert_eq!(
        read(&root, "Shop.SemanticModel/definition/tables/Customers.tmdl"),
        common::CUSTOMERS_TABLE
    );
    assert!(!result
        .files_modified
        .iter()
        .any(|f| f.ends_with("Customers.tmdl")));
}

#[test]
fn round_trip_restores_every_file_byte_for_byte() {
    for layout in [Layout::Legacy, Layout::Enhanced] {
        let dir = tempfile::tempdir().unwrap();
        let root = shop_project(dir.path(), layout);
        let before = snapshot(&root);
        let project = Project::load(&root).unwrap();
        let mut session = SessionState::new();

        batch_rename(
            &project,
            &mut session,
            &[RenameOperation::table("Sales Data", "Revenue")],
            &no_backup(),
            false,
        )
        .unwrap();
        assert_ne!(snapshot(&root), before);

        let back = batch_rename(
            &project,
            &mut session,
            &[RenameOperation::table("Revenue", "Sales Data")],
            &no_backup(),
            false,
        )
        .unwrap();

        assert!(back.success);
        assert_eq!(snapshot(&root), before, "{:?}", layout);
    }
}

#[test]
fn enhanced_report_table_rename() {
    let dir = tempfile::tempdir().unwrap();
    let root = shop_project(dir.path(), Layout::Enhanced);
    let project = Project::load(&root).unwrap();
    assert_eq!(project.report_format(), ReportFormat::Enhanced);

    batch_rename(
        &project,
        &mut SessionState::new(),
        &[RenameOperation::table("Sales Data", "Order Data")],
        &no_backup(),
        false,
    )
    .unwrap();

    let visual = read(
        &root,
        "Shop.Report/definition/pages/p1/visuals/v1/visual.json",
    );
    assert_eq!(visual.matches(r#""Entity": "Order Data""#).count(), 2);
    assert!(visual.contains(r#""queryRef": "Order Data.Amount""#));
    assert!(visual.contains(r#""queryRef": "Sum(Order Data.Amount)""#));
    assert!(visual.contains(r#""Entity": "Customers""#));
    assert!(visual.contains(r#""nativeQueryRef": "Amount""#));

    let sales = read(&root, "Shop.SemanticModel/definition/tables/Sales Data.tmdl");
    assert!(sales.starts_with("table 'Order Data'\n"));
    assert!(sales.contains("SUM('Order Data'[Amount])"));
}

#[test]
fn column_rename_on_enhanced_report() {
    let dir = tempfile::tempdir().unwrap();
    let root = shop_project(dir.path(), Layout::Enhanced);
    let project = Project::load(&root).unwrap();

    let result = batch_rename(
        &project,
        &mut SessionState::new(),
        &[RenameOperation::column("Sales Data", "Amount", "Net Amount")],
        &no_backup(),
        false,
    )
    .unwrap();

    assert!(result.success, "{:?}", result.validation_errors);
    assert_eq!(result.references_updated, 6);
    assert_eq!(result.files_modified.len(), 2);

    let sales = read(&root, "Shop.SemanticModel/definition/tables/Sales Data.tmdl");
    assert!(sales.contains("SUM('Sales Data'[Net Amount])"));
    assert!(sales.contains("\tcolumn 'Net Amount'\n"));
    assert!(sales.contains("sourceColumn: Amount\n"));

    let visual = read(
        &root,
        "Shop.Report/definition/pages/p1/visuals/v1/visual.json",
    );
    assert_eq!(visual.matches(r#""Property": "Net Amount""#).count(), 2);
    assert!(visual.contains(r#""queryRef": "Sales Data.Net Amount""#));
    assert!(visual.contains(r#""queryRef": "Sum(Sales Data.Net Amount)""#));
    assert!(visual.contains(r#""Property": "Name""#));

    let hits = &result.renames[0].rule_hits;
    assert_eq!(hits["column.report.entity_property"], 2);
    assert_eq!(hits["column.bracket.quoted_table"], 1);
}

#[test]
fn scenario_order_data_declaration_and_bracket_access() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("Orders");
    write(&root.join("Orders.pbip"), "{}");
    let table = root.join("Orders.SemanticModel/definition/tables/Sales.tmdl");
    write(&table, "table Sales\n  measure Total = SUM(Sales[Amount])");
    let project = Project::load(&root).unwrap();

    let result = batch_rename(
        &project,
        &mut SessionState::new(),
        &[RenameOperation::table("Sales", "Order Data")],
        &no_backup(),
        false,
    )
    .unwrap();

    assert!(result.success);
    assert_eq!(result.references_updated, 2);
    assert_eq!(
        std::fs::read_to_string(&table).unwrap(),
        "table 'Order Data'\n  measure Total = SUM('Order Data'[Amount])"
    );
}

#[test]
fn scenario_relationship_tables() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("Orders");
    write(&root.join("Orders.pbip"), "{}");
    let definition = root.join("Orders.SemanticModel/definition");
    write(&definition.join("tables/Sales.tmdl"), "table Sales\n");
    write(&definition.join("tables/Customers.tmdl"), "table Customers\n");
    let relationships = definition.join("relationships.tmdl");
    write(
        &relationships,
        "relationship 3f1e\n\tfromTable: Sales\n\ttoTable: Customers\n",
    );
    let project = Project::load(&root).unwrap();

    batch_rename(
        &project,
        &mut SessionState::new(),
        &[RenameOperation::table("Sales", "Order Data")],
        &no_backup(),
        false,
    )
    .unwrap();

    assert_eq!(
        std::fs::read_to_string(&relationships).unwrap(),
        "relationship 3f1e\n\tfromTable: 'Order Data'\n\ttoTable: Customers\n"
    );
}

#[test]
fn scenario_report_entity() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("Orders");
    write(&root.join("Orders.pbip"), "{}");
    write(
        &root.join("Orders.SemanticModel/definition/tables/Sales.tmdl"),
        "table Sales\n",
    );
    let visual = root.join("Orders.Report/definition/pages/p/visuals/v/visual.json");
    write(&visual, r#"{"Entity": "Sales", "Property": "Amount"}"#);
    let project = Project::load(&root).unwrap();

    batch_rename(
        &project,
        &mut SessionState::new(),
        &[RenameOperation::table("Sales", "Order Data")],
        &no_backup(),
        false,
    )
    .unwrap();

    assert_eq!(
        std::fs::read_to_string(&visual).unwrap(),
        r#"{"Entity": "Order Data", "Property": "Amount"}"#
    );
}

#[test]
fn scenario_unqualified_relationship_column() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("Projects");
    write(&root.join("Projects.pbip"), "{}");
    let definition = root.join("Projects.SemanticModel/definition");
    let sales = definition.join("tables/Sales.tmdl");
    write(
        &sales,
        "table Sales\n\tmeasure 'Project Count' = DISTINCTCOUNT(Sales[ProjectKey])\n\n\tcolumn ProjectKey\n\t\tdataType: int64\n",
    );
    write(
        &definition.join("tables/Projects.tmdl"),
        "table Projects\n\tcolumn ProjectKey\n\t\tdataType: int64\n",
    );
    let relationships = definition.join("relationships.tmdl");
    write(
        &relationships,
        "relationship 9a7c\n\tfromTable: Sales\n\tfromColumn: ProjectKey\n\ttoTable: Projects\n\ttoColumn: ProjectKey\n",
    );
    let project = Project::load(&root).unwrap();

    let result = batch_rename(
        &project,
        &mut SessionState::new(),
        &[RenameOperation::column("Sales", "ProjectKey", "ProjectId")],
        &no_backup(),
        false,
    )
    .unwrap();

    assert!(result.success);
    assert_eq!(
        std::fs::read_to_string(&relationships).unwrap(),
        "relationship 9a7c\n\tfromTable: Sales\n\tfromColumn: ProjectId\n\ttoTable: Projects\n\ttoColumn: ProjectKey\n"
    );
    assert_eq!(
        std::fs::read_to_string(&sales).unwrap(),
        "table Sales\n\tmeasure 'Project Count' = DISTINCTCOUNT(Sales[ProjectId])\n\n\tcolumn ProjectId\n\t\tdataType: int64\n"
    );
    assert_eq!(
        std::fs::read_to_string(definition.join("tables/Projects.tmdl")).unwrap(),
        "table Projects\n\tcolumn ProjectKey\n\t\tdataType: int64\n"
    );
}

#[test]
fn measure_rename_in_model_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("Shop");
    write(&root.join("Shop.pbip"), "{}");
    let sales = root.join("Shop.SemanticModel/definition/tables/Sales.tmdl");
    write(
        &sales,
        "table Sales\n\tmeasure Total = SUM(Sales[Amount])\n\tmeasure Share = DIVIDE([Total], [Total] + 1)\n\tcolumn Amount\n",
    );
    let visual = root.join("Shop.Report/definition/pages/p/visuals/v/visual.json");
    write(
        &visual,
        r#"{"Measure": {"Expression": {"SourceRef": {"Entity": "Sales"}}, "Property": "Total"}, "queryRef": "Sales.Total"}"#,
    );
    let project = Project::load(&root).unwrap();

    let result = batch_rename(
        &project,
        &mut SessionState::new(),
        &[RenameOperation::measure("Total", "Gross Total")],
        &no_backup(),
        false,
    )
    .unwrap();

    assert!(result.success);
    assert_eq!(result.references_updated, 5);
    assert_eq!(
        std::fs::read_to_string(&sales).unwrap(),
        "table Sales\n\tmeasure 'Gross Total' = SUM(Sales[Amount])\n\tmeasure Share = DIVIDE([Gross Total], [Gross Total] + 1)\n\tcolumn Amount\n"
    );
    assert_eq!(
        std::fs::read_to_string(&visual).unwrap(),
        r#"{"Measure": {"Expression": {"SourceRef": {"Entity": "Sales"}}, "Property": "Gross Total"}, "queryRef": "Sales.Gross Total"}"#
    );
}

#[test]
fn collision_is_rejected_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let root = shop_project(dir.path(), Layout::Legacy);
    let before = snapshot(&root);
    let project = Project::load(&root).unwrap();

    let err = batch_rename(
        &project,
        &mut SessionState::new(),
        &[RenameOperation::table("Sales Data", "customers")],
        &pbip_refactor::defaults::RefactorConfig::default(),
        false,
    )
    .unwrap_err();

    assert_eq!(err.code.as_str(), "rename.name_collision");
    assert_eq!(snapshot(&root), before);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn dry_run_previews_without_touching_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = shop_project(dir.path(), Layout::Enhanced);
    let before = snapshot(&root);
    let project = Project::load(&root).unwrap();

    let preview = batch_rename(
        &project,
        &mut SessionState::new(),
        &[RenameOperation::table("Sales Data", "Revenue")],
        &pbip_refactor::defaults::RefactorConfig::default(),
        true,
    )
    .unwrap();

    assert!(preview.dry_run);
    assert!(preview.backup_path.is_none());
    assert_eq!(snapshot(&root), before);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    let applied = batch_rename(
        &project,
        &mut SessionState::new(),
        &[RenameOperation::table("Sales Data", "Revenue")],
        &no_backup(),
        false,
    )
    .unwrap();

    assert_eq!(preview.references_updated, applied.references_updated);
    assert_eq!(preview.files_modified, applied.files_modified);
}

#[test]
fn pre_existing_violations_fail_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("Leads");
    write(&root.join("Leads.pbip"), "{}");
    write(
        &root.join("Leads.SemanticModel/definition/tables/Leads.tmdl"),
        "table Leads Sales Data\n\tmeasure Total = SUM(Leads Sales Data[Amount])\n",
    );
    let project = Project::load(&root).unwrap();

    let result = batch_rename(
        &project,
        &mut SessionState::new(),
        &[RenameOperation::measure("Total", "Pipeline")],
        &no_backup(),
        false,
    )
    .unwrap();

    assert!(!result.success);
    assert!(result.validated);
    assert_eq!(result.references_updated, 1);
    let categories: Vec<_> = result
        .validation_errors
        .iter()
        .map(|e| e.category)
        .collect();
    assert_eq!(
        categories,
        vec![
            ValidationCategory::UnquotedDeclaration,
            ValidationCategory::UnquotedDaxReference
        ]
    );
    assert_eq!(validate(&project).len(), 2);
}

#[test]
fn longer_table_ending_in_the_old_name_is_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let root = shop_project(dir.path(), Layout::Legacy);
    let leads = "Shop.SemanticModel/definition/tables/Leads Sales Data.tmdl";
    write(
        &root.join(leads),
        "table 'Leads Sales Data'\n\tmeasure Pipeline = SUM(Leads Sales Data[Amount]) + COUNTROWS('Sales Data')\n\tcolumn Amount\n",
    );
    let project = Project::load(&root).unwrap();

    let result = batch_rename(
        &project,
        &mut SessionState::new(),
        &[RenameOperation::table("Sales Data", "Revenue")],
        &no_backup(),
        false,
    )
    .unwrap();

    assert_eq!(
        read(&root, leads),
        "table 'Leads Sales Data'\n\tmeasure Pipeline = SUM(Leads Sales Data[Amount]) + COUNTROWS(Revenue)\n\tcolumn Amount\n"
    );
    assert!(read(&root, "Shop.SemanticModel/definition/tables/Sales Data.tmdl")
        .starts_with("table Revenue\n"));

    assert!(!result.success);
    assert_eq!(result.validation_errors.len(), 1, "{:?}", result.validation_errors);
    assert_eq!(
        result.validation_errors[0].message,
        "Reference to table 'Leads Sales Data' must be quoted"
    );
}
