//! Canonical relational schema for the five university tables.
//!
//! Each [`Entity`] owns a static [`TableSchema`] describing its destination
//! table: column names (spelled exactly as the source workbooks spell them),
//! column types, primary key, and foreign keys. The sheet headers of an
//! entity are its columns minus the `uni_name` stamp that child entities
//! inherit from the University sheet.

use std::fmt;

/// Name of the column every child entity inherits from the University sheet.
pub const UNI_NAME: &str = "uni_name";

/// Name of the identifying column of every row-per-record sheet.
pub const PROGRAMME_NAME: &str = "programme_name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
}

impl ColumnType {
    /// Postgres type used when the table is created.
    #[must_use]
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Text => "VARCHAR",
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "DOUBLE PRECISION",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

impl Column {
    const fn text(name: &'static str) -> Self {
        Self {
            name,
            ty: ColumnType::Text,
        }
    }

    const fn integer(name: &'static str) -> Self {
        Self {
            name,
            ty: ColumnType::Integer,
        }
    }

    const fn float(name: &'static str) -> Self {
        Self {
            name,
            ty: ColumnType::Float,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references_table: &'static str,
    pub references_column: &'static str,
}

impl ForeignKey {
    const fn new(
        column: &'static str,
        references_table: &'static str,
        references_column: &'static str,
    ) -> Self {
        Self {
            column,
            references_table,
            references_column,
        }
    }
}

#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub primary_key: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
}

impl TableSchema {
    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

const UNIVERSITY_FK: ForeignKey = ForeignKey::new(UNI_NAME, "University", UNI_NAME);
const PROGRAMME_FK: ForeignKey = ForeignKey::new(PROGRAMME_NAME, "Programme", PROGRAMME_NAME);

pub static UNIVERSITY: TableSchema = TableSchema {
    name: "University",
    columns: &[
        Column::text(UNI_NAME),
        Column::text("location"),
        Column::integer("founded"),
        Column::text("website"),
        Column::integer("overall_ranking"),
        Column::integer("International_Students"),
        Column::float("Female_Male_Ratio"),
        Column::integer("total_students"),
        Column::text("athletics"),
        Column::text("contact"),
        Column::float("research_funding"),
        Column::text("airport_transportation"),
        Column::text("bus_availability"),
        Column::float("train_station_distance"),
        Column::text("nearby_shopping_areas"),
        Column::text("campus_facilities"),
        Column::text("emergency_services"),
        Column::text("student_housing"),
        Column::float("Living costs"),
        Column::text("student_clubs_organizations"),
        Column::text("Public_Private"),
    ],
    primary_key: &[UNI_NAME],
    foreign_keys: &[],
};

pub static PROGRAMME: TableSchema = TableSchema {
    name: "Programme",
    columns: &[
        Column::text(UNI_NAME),
        Column::text(PROGRAMME_NAME),
        Column::text("duration"),
        Column::text("description"),
        Column::text("fees (annual)"),
        Column::text("admission_requirements"),
        Column::text("degree_awarded"),
        Column::text("mode_of_study"),
        Column::text("on_off_campus"),
        Column::text("scholarships"),
        Column::text("language_of_instruction"),
        Column::text("internship_opportunities"),
        Column::text("study_abroad_opportunities"),
    ],
    primary_key: &[PROGRAMME_NAME],
    foreign_keys: &[UNIVERSITY_FK],
};

pub static PROGRAMME_DESCRIPTION: TableSchema = TableSchema {
    name: "ProgrammeDescription",
    columns: &[
        Column::text(UNI_NAME),
        Column::text(PROGRAMME_NAME),
        Column::text("overview"),
        Column::text("website"),
        Column::text("learning_objectives"),
        Column::text("program_structure"),
        Column::text("specialisations"),
        Column::text("career_opportunities"),
    ],
    primary_key: &[PROGRAMME_NAME],
    foreign_keys: &[UNIVERSITY_FK, PROGRAMME_FK],
};

pub static COURSE_DESCRIPTION: TableSchema = TableSchema {
    name: "CourseDescription",
    columns: &[
        Column::text(UNI_NAME),
        Column::text(PROGRAMME_NAME),
        Column::text("course_name"),
        Column::text("course_description"),
        Column::text("course_objectives"),
        Column::text("core_elective"),
    ],
    primary_key: &["course_name"],
    foreign_keys: &[UNIVERSITY_FK, PROGRAMME_FK],
};

pub static TEST_TYPE: TableSchema = TableSchema {
    name: "TestType",
    columns: &[
        Column::text(UNI_NAME),
        Column::text(PROGRAMME_NAME),
        Column::text("test_name"),
        Column::float("average_score"),
        Column::float("minimum_score"),
    ],
    primary_key: &[UNI_NAME, PROGRAMME_NAME, "test_name"],
    foreign_keys: &[UNIVERSITY_FK, PROGRAMME_FK],
};

/// One of the five canonical tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    University,
    Programme,
    ProgrammeDescription,
    CourseDescription,
    TestType,
}

impl Entity {
    /// All entities in foreign-key dependency order. Tables must be written
    /// in this order so every parent exists before its children.
    pub const ALL: [Entity; 5] = [
        Entity::University,
        Entity::Programme,
        Entity::ProgrammeDescription,
        Entity::CourseDescription,
        Entity::TestType,
    ];

    #[must_use]
    pub fn schema(self) -> &'static TableSchema {
        match self {
            Entity::University => &UNIVERSITY,
            Entity::Programme => &PROGRAMME,
            Entity::ProgrammeDescription => &PROGRAMME_DESCRIPTION,
            Entity::CourseDescription => &COURSE_DESCRIPTION,
            Entity::TestType => &TEST_TYPE,
        }
    }

    /// Destination table name; also the expected worksheet name.
    #[must_use]
    pub fn table_name(self) -> &'static str {
        self.schema().name
    }

    /// Canonical output columns, including the inherited `uni_name` for
    /// child entities.
    #[must_use]
    pub fn columns(self) -> Vec<&'static str> {
        self.schema().column_names().collect()
    }

    /// Headers a source sheet carries. Child sheets never contain
    /// `uni_name`; it is stamped from the file's anchor.
    #[must_use]
    pub fn sheet_headers(self) -> Vec<&'static str> {
        match self {
            Entity::University => self.columns(),
            _ => self
                .schema()
                .column_names()
                .filter(|name| *name != UNI_NAME)
                .collect(),
        }
    }

    /// Column whose value identifies a record; blank or header-echo values
    /// in it disqualify the row.
    #[must_use]
    pub fn key_column(self) -> &'static str {
        match self {
            Entity::University => UNI_NAME,
            _ => PROGRAMME_NAME,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}
