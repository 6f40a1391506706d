//! Target table definitions for the SALT star schema and the DDL that
//! recreates them.

use super::store::Store;
use super::writer::InsertTemplate;
use crate::error::{LoadError, Result};

/// A foreign key from `columns` to `parent_columns` of `parent`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub columns: &'static [&'static str],
    pub parent: &'static str,
    pub parent_columns: &'static [&'static str],
}

impl ForeignKey {
    const fn new(
        column: &'static [&'static str],
        parent: &'static str,
        parent_column: &'static [&'static str],
    ) -> Self {
        Self {
            columns: column,
            parent,
            parent_columns: parent_column,
        }
    }
}

/// Static description of one target table
///
/// Columns are listed in insert order; the same order is used when projecting
/// the source file. Every column is stored as TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub primary_key: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
    /// File name inside the source directory
    pub source_file: &'static str,
    /// Columns whose native date/time values are normalized to text on read
    pub temporal_columns: &'static [&'static str],
}

// =============================================================================
// SALT tables
// =============================================================================

pub static ADDRESSES: TableDef = TableDef {
    name: "I_AddrOrgNamePostalAddress",
    columns: &["ADDRESSID", "ADDRESSREPRESENTATIONCODE", "COUNTRY", "REGION"],
    primary_key: &["ADDRESSID"],
    foreign_keys: &[],
    source_file: "I_AddrOrgNamePostalAddress.parquet",
    temporal_columns: &[],
};

pub static CUSTOMERS: TableDef = TableDef {
    name: "I_Customer",
    columns: &["CUSTOMER", "ADDRESSID"],
    primary_key: &["CUSTOMER"],
    foreign_keys: &[ForeignKey::new(
        &["ADDRESSID"],
        "I_AddrOrgNamePostalAddress",
        &["ADDRESSID"],
    )],
    source_file: "I_Customer.parquet",
    temporal_columns: &[],
};

pub static SALES_DOCUMENTS: TableDef = TableDef {
    name: "I_SalesDocument",
    columns: &[
        "SALESDOCUMENT",
        "SALESOFFICE",
        "SALESGROUP",
        "CUSTOMERPAYMENTTERMS",
        "SHIPPINGCONDITION",
        "SALESDOCUMENTTYPE",
        "SALESORGANIZATION",
        "DISTRIBUTIONCHANNEL",
        "ORGANIZATIONDIVISION",
        "BILLINGCOMPANYCODE",
        "TRANSACTIONCURRENCY",
        "INCOTERMSCLASSIFICATION",
        "CREATIONDATE",
        "CREATIONTIME",
    ],
    primary_key: &["SALESDOCUMENT"],
    foreign_keys: &[],
    source_file: "I_SalesDocument_train.parquet",
    temporal_columns: &["CREATIONDATE", "CREATIONTIME"],
};

pub static SALES_DOCUMENT_ITEMS: TableDef = TableDef {
    name: "I_SalesDocumentItem",
    columns: &[
        "SALESDOCUMENT",
        "SALESDOCUMENTITEM",
        "PLANT",
        "SHIPPINGPOINT",
        "SALESDOCUMENTITEMCATEGORY",
        "PRODUCT",
        "SOLDTOPARTY",
        "SHIPTOPARTY",
        "BILLTOPARTY",
        "PAYERPARTY",
        "INCOTERMSCLASSIFICATION",
    ],
    primary_key: &["SALESDOCUMENT", "SALESDOCUMENTITEM"],
    foreign_keys: &[
        ForeignKey::new(&["SALESDOCUMENT"], "I_SalesDocument", &["SALESDOCUMENT"]),
        ForeignKey::new(&["SOLDTOPARTY"], "I_Customer", &["CUSTOMER"]),
        ForeignKey::new(&["SHIPTOPARTY"], "I_Customer", &["CUSTOMER"]),
        ForeignKey::new(&["BILLTOPARTY"], "I_Customer", &["CUSTOMER"]),
        ForeignKey::new(&["PAYERPARTY"], "I_Customer", &["CUSTOMER"]),
    ],
    source_file: "I_SalesDocumentItem_train.parquet",
    temporal_columns: &[],
};

/// All SALT tables in load order: every table follows the tables it references
pub static LOAD_ORDER: [&TableDef; 4] = [
    &ADDRESSES,
    &CUSTOMERS,
    &SALES_DOCUMENTS,
    &SALES_DOCUMENT_ITEMS,
];

impl TableDef {
    /// Names of the tables this table references, without duplicates
    pub fn parents(&self) -> Vec<&'static str> {
        let mut parents: Vec<&'static str> = Vec::new();
        for fk in self.foreign_keys {
            if !parents.contains(&fk.parent) {
                parents.push(fk.parent);
            }
        }
        parents
    }

    /// Generate the CREATE TABLE statement
    pub fn create_sql(&self) -> String {
        let mut ddl = format!("CREATE TABLE \"{}\" (\n", self.name);

        let mut clauses: Vec<String> = self
            .columns
            .iter()
            .map(|col| {
                let nullable_clause = if self.primary_key.contains(col) {
                    " NOT NULL"
                } else {
                    ""
                };
                format!("  \"{}\" TEXT{}", col, nullable_clause)
            })
            .collect();

        clauses.push(format!("  PRIMARY KEY ({})", quote_list(self.primary_key)));

        for fk in self.foreign_keys {
            clauses.push(format!(
                "  FOREIGN KEY ({}) REFERENCES \"{}\" ({})",
                quote_list(fk.columns),
                fk.parent,
                quote_list(fk.parent_columns)
            ));
        }

        ddl.push_str(&clauses.join(",\n"));
        ddl.push_str("\n)");

        ddl
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS \"{}\"", self.name)
    }

    /// Insert template that skips rows whose primary key already exists
    pub fn insert_template(&self) -> InsertTemplate {
        InsertTemplate::new(self.name, self.columns)
    }
}

fn quote_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Order `tables` so that every table comes after the tables it references
///
/// The order is stable: among tables whose parents are all placed, the one
/// listed first is placed first.
pub fn creation_order<'a>(tables: &[&'a TableDef]) -> Result<Vec<&'a TableDef>> {
    for table in tables {
        for parent in table.parents() {
            if !tables.iter().any(|t| t.name == parent) {
                return Err(LoadError::SchemaDefinition {
                    message: format!(
                        "table '{}' references '{}', which is not defined",
                        table.name, parent
                    ),
                });
            }
        }
    }

    let mut ordered: Vec<&'a TableDef> = Vec::with_capacity(tables.len());
    while ordered.len() < tables.len() {
        let next = tables.iter().find(|table| {
            !ordered.iter().any(|o| o.name == table.name)
                && table
                    .parents()
                    .iter()
                    .all(|p| *p == table.name || ordered.iter().any(|o| o.name == *p))
        });

        match next {
            Some(table) => ordered.push(*table),
            None => {
                let remaining: Vec<&str> = tables
                    .iter()
                    .filter(|t| !ordered.iter().any(|o| o.name == t.name))
                    .map(|t| t.name)
                    .collect();
                return Err(LoadError::SchemaDefinition {
                    message: format!("cyclic foreign keys between {}", remaining.join(", ")),
                });
            }
        }
    }

    Ok(ordered)
}

/// Drop and recreate `tables`
///
/// Children are dropped before parents and parents created before children,
/// so this is safe to run against a database that already holds the tables
/// with foreign-key enforcement on.
pub async fn recreate_tables(store: &mut Store, tables: &[&TableDef]) -> Result<()> {
    let ordered = creation_order(tables)?;

    for table in ordered.iter().rev() {
        tracing::debug!(table = table.name, "dropping table");
        store.execute_ddl(table.name, &table.drop_sql()).await?;
    }

    for table in &ordered {
        tracing::debug!(table = table.name, "creating table");
        store.execute_ddl(table.name, &table.create_sql()).await?;
    }

    tracing::info!(tables = ordered.len(), "schema recreated");
    Ok(())
}
