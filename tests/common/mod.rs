#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use pbip_refactor::defaults::RefactorConfig;

pub const SALES_TABLE: &str = "table 'Sales Data'
\tlineageTag: 0d1c2f51

\tmeasure 'Total Amount' = SUM('Sales Data'[Amount])
\t\tformatString: #,0.00

\tmeasure 'Row Count' = COUNTROWS('Sales Data')

\tcolumn Amount
\t\tdataType: decimal
\t\tsourceColumn: Amount

\tcolumn CustomerKey
\t\tdataType: int64
\t\tsourceColumn: CustomerKey

\tpartition 'Sales Data' = m
\t\tmode: import
";

pub const CUSTOMERS_TABLE: &str = "table Customers
\tlineageTag: 7a9e11c0

\tmeasure 'Customer Count' = COUNTROWS(Customers)

\tcolumn CustomerKey
\t\tdataType: int64

\tcolumn Name
\t\tdataType: string
";

pub const RELATIONSHIPS: &str = "relationship 'Sales Data to Customers'
\tfromTable: 'Sales Data'
\tfromColumn: 'Sales Data'.CustomerKey
\ttoTable: Customers
\ttoColumn: Customers.CustomerKey
";

pub const MODEL: &str = "model Model
\tculture: en-US

annotation PBI_QueryOrder = [\"Sales Data\",\"Customers\"]

ref table 'Sales Data'
ref table Customers
";

pub const CULTURE: &str = "cultureInfo en-US

\tlinguisticMetadata =
\t\t\t{
\t\t\t  \"Version\": \"1.0.0\",
\t\t\t  \"Entities\": {
\t\t\t    \"sales_data\": {
\t\t\t      \"Binding\": {
\t\t\t        \"ConceptualEntity\": \"Sales Data\"
\t\t\t      }
\t\t\t    }
\t\t\t  }
\t\t\t}
\t\tcontentType: json
";

pub const DIAGRAM: &str = r#"{
  "version": "1.1.0",
  "diagrams": [
    {
      "name": "All tables",
      "nodes": [
        { "nodeIndex": "Sales Data", "location": { "x": 0, "y": 0 } },
        { "nodeIndex": "Customers", "location": { "x": 320, "y": 0 } }
      ]
    }
  ]
}
"#;

pub const LEGACY_REPORT: &str = r#"{
  "sections": [
    {
      "name": "ReportSection",
      "visualContainers": [
        {
          "config": "{\"singleVisual\":{\"prototypeQuery\":{\"From\":[{\"Name\":\"s\",\"Entity\":\"Sales Data\"}],\"Select\":[{\"Column\":{\"Expression\":{\"SourceRef\":{\"Source\":\"s\"}},\"Property\":\"Amount\"},\"Name\":\"Sales Data.Amount\"}]}}}"
        }
      ]
    }
  ]
}
"#;

pub const ENHANCED_VISUAL: &str = r#"{
  "name": "v1",
  "visual": {
    "visualType": "tableEx",
    "query": {
      "queryState": {
        "Values": {
          "projections": [
            {
              "field": {
                "Column": {
                  "Expression": { "SourceRef": { "Entity": "Sales Data" } },
                  "Property": "Amount"
                }
              },
              "queryRef": "Sales Data.Amount",
              "nativeQueryRef": "Amount"
            },
            {
              "field": {
                "Aggregation": {
                  "Expression": {
                    "Column": {
                      "Expression": { "SourceRef": { "Entity": "Sales Data" } },
                      "Property": "Amount"
                    }
                  },
                  "Function": 0
                }
              },
              "queryRef": "Sum(Sales Data.Amount)",
              "nativeQueryRef": "Sum of Amount"
            },
            {
              "field": {
                "Column": {
                  "Expression": { "SourceRef": { "Entity": "Customers" } },
                  "Property": "Name"
                }
              },
              "queryRef": "Customers.Name"
            }
          ]
        }
      }
    }
  }
}
"#;

/// Report layout written by [`shop_project`].
#[derive(Debug, Clone, Copy)]
pub enum Layout {
    Legacy,
    Enhanced,
}

pub fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Lay out a canonical two-table project under `<dir>/Shop` and return its root.
pub fn shop_project(dir: &Path, layout: Layout) -> PathBuf {
    let root = dir.join("Shop");
    let model = root.join("Shop.SemanticModel");
    let definition = model.join("definition");

    write(&root.join("Shop.pbip"), r#"{"version": "1.0"}"#);
    write(&definition.join("model.tmdl"), MODEL);
    write(&definition.join("relationships.tmdl"), RELATIONSHIPS);
    write(&definition.join("tables/Sales Data.tmdl"), SALES_TABLE);
    write(&definition.join("tables/Customers.tmdl"), CUSTOMERS_TABLE);
    write(&definition.join("cultures/en-US.tmdl"), CULTURE);
    write(&model.join("diagramLayout.json"), DIAGRAM);

    let report = root.join("Shop.Report");
    match layout {
        Layout::Legacy => write(&report.join("report.json"), LEGACY_REPORT),
        Layout::Enhanced => write(
            &report.join("definition/pages/p1/visuals/v1/visual.json"),
            ENHANCED_VISUAL,
        ),
    }

    root
}

/// Every file under `root` with its content, keyed by relative path.
pub fn snapshot(root: &Path) -> Vec<(String, String)> {
    let mut files = Vec::new();
    collect(root, root, &mut files);
    files.sort();
    files
}

fn collect(root: &Path, dir: &Path, files: &mut Vec<(String, String)>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let relative = path.strip_prefix(root).unwrap().display().to_string();
            files.push((relative, fs::read_to_string(&path).unwrap()));
        }
    }
}

pub fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

pub fn no_backup() -> RefactorConfig {
    RefactorConfig {
        auto_backup: false,
        ..RefactorConfig::default()
    }
}
