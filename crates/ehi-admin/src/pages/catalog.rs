//! Every page of the dashboard: its route, module, template and tables.
//!
//! Paths are relative to the mount prefix. A table's `key` names its
//! containers (`{key}-table`, `{key}-pager`, `{key}-search`, `{key}-add`) and
//! is the page key its row actions carry.

use router::MountConfig;

const USER_HEADERS: &[&str] = &[
    "Date",
    "Last Name",
    "First Name",
    "Location",
    "Poverty Status",
    "Pin",
    "Score",
];
const DONOR_HEADERS: &[&str] = &[
    "Date",
    "Donor ID",
    "Last Name",
    "First Name",
    "Email",
    "Phone Number",
    "Address",
    "Gender",
];
const PROGRAMME_HEADERS: &[&str] = &[
    "Date",
    "Name of Beneficiary",
    "Safety Net",
    "Upliftment Project",
    "Referral to Micro-Credit",
];
const DISBURSEMENT_HEADERS: &[&str] = &["Date", "Receiver", "Pin", "Status", "Item Category"];
const LEDGER_HEADERS: &[&str] = &["Name", "Category", "Amount", "Date"];
const RECEIPT_HEADERS: &[&str] = &["Date", "Donor Name", "Amount", "Receipt Type"];
const EXPENSE_HEADERS: &[&str] = &["Date", "Payment Details", "Amount", "Payment Type"];
const SEGREGATION_HEADERS: &[&str] = &["Date", "Pin", "Gender", "Item"];
const BENEFICIARY_HEADERS: &[&str] = &["Date", "First Name", "Last Name", "Pin", "Gender", "Age"];
const DONATION_HEADERS: &[&str] = &["Date", "Name of Donor", "Item", "Quantity", "Amount"];
const ARCHIVE_HEADERS: &[&str] = &["Date", "First Name", "Last Name", "Pin", "Gender"];
const STAFF_HEADERS: &[&str] = &["Date", "Last Name", "First Name", "Email", "Role"];

const CRUD: &[&str] = &["View", "Edit", "Delete"];

/// One paginated table on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub key: &'static str,
    /// Record store the rows come from.
    pub store: &'static str,
    pub headers: &'static [&'static str],
    pub actions: &'static [&'static str],
    pub select: bool,
    pub searchable: bool,
    pub can_add: bool,
    /// Store a restored record moves to.
    pub restore_to: Option<&'static str>,
}

impl TableDef {
    const fn new(
        key: &'static str,
        store: &'static str,
        headers: &'static [&'static str],
        actions: &'static [&'static str],
    ) -> Self {
        Self {
            key,
            store,
            headers,
            actions,
            select: false,
            searchable: true,
            can_add: false,
            restore_to: None,
        }
    }

    const fn report(
        key: &'static str,
        store: &'static str,
        headers: &'static [&'static str],
    ) -> Self {
        let mut def = Self::new(key, store, headers, &[]);
        def.searchable = false;
        def
    }

    const fn addable(mut self) -> Self {
        self.can_add = true;
        self
    }

    const fn archive(mut self, restore_to: &'static str) -> Self {
        self.select = true;
        self.restore_to = Some(restore_to);
        self
    }

    #[must_use]
    pub fn table_id(&self) -> String {
        format!("{}-table", self.key)
    }

    #[must_use]
    pub fn pager_id(&self) -> String {
        format!("{}-pager", self.key)
    }

    #[must_use]
    pub fn search_id(&self) -> String {
        format!("{}-search", self.key)
    }

    #[must_use]
    pub fn add_id(&self) -> String {
        format!("{}-add", self.key)
    }

    fn markup(&self) -> String {
        let mut out = String::new();
        if self.searchable || self.can_add {
            out.push_str("  <div class=\"table-tools\">\n");
            if self.searchable {
                out.push_str(&format!(
                    "    <input id=\"{}\" type=\"search\" placeholder=\"Search\">\n",
                    self.search_id()
                ));
            }
            if self.can_add {
                out.push_str(&format!("    <button id=\"{}\">Add</button>\n", self.add_id()));
            }
            out.push_str("  </div>\n");
        }
        out.push_str(&format!("  <div id=\"{}\" class=\"table\"></div>\n", self.table_id()));
        out.push_str(&format!("  <div id=\"{}\" class=\"pager\"></div>\n", self.pager_id()));
        out
    }
}

/// What a page shows below its heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Store counts, refreshed on a timer.
    Dashboard,
    Tables(&'static [TableDef]),
}

/// One routable page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDef {
    /// Path below the mount prefix (`/finance/assets`).
    pub path: &'static str,
    pub heading: &'static str,
    pub module: &'static str,
    pub initializer: &'static str,
    pub stylesheet: bool,
    pub layout: Layout,
}

impl PageDef {
    const fn tables(
        path: &'static str,
        heading: &'static str,
        module: &'static str,
        initializer: &'static str,
        tables: &'static [TableDef],
    ) -> Self {
        Self {
            path,
            heading,
            module,
            initializer,
            stylesheet: true,
            layout: Layout::Tables(tables),
        }
    }

    const fn without_stylesheet(mut self) -> Self {
        self.stylesheet = false;
        self
    }

    /// Tables on the page; empty for the dashboard.
    #[must_use]
    pub fn table_defs(&self) -> &'static [TableDef] {
        match self.layout {
            Layout::Tables(tables) => tables,
            Layout::Dashboard => &[],
        }
    }

    /// Full route under `mount`.
    #[must_use]
    pub fn route(&self, mount: &MountConfig) -> String {
        format!("{}{}", mount.mount_prefix, self.path)
    }

    /// The page's HTML fragment.
    #[must_use]
    pub fn template(&self) -> String {
        let mut out = String::from("<section class=\"page\">\n");
        out.push_str(&format!("  <h2 id=\"page-title\">{}</h2>\n", self.heading));
        match self.layout {
            Layout::Dashboard => {
                out.push_str("  <div id=\"dashboard-stats\" class=\"stats\"></div>\n");
            }
            Layout::Tables(tables) => {
                for table in tables {
                    out.push_str(&table.markup());
                }
            }
        }
        out.push_str("</section>\n");
        out
    }

    /// The page's layout stylesheet.
    #[must_use]
    pub fn stylesheet_text(&self) -> String {
        let mut out = format!(
            ".page {{ padding: 1rem; }}\n#page-title::before {{ content: \"{}\"; }}\n",
            self.heading
        );
        for table in self.table_defs() {
            out.push_str(&format!("#{} {{ overflow-x: auto; }}\n", table.table_id()));
        }
        out
    }
}

const USERS_TABLES: &[TableDef] = &[TableDef::new("users", "users", USER_HEADERS, CRUD).addable()];
const DONORS_TABLES: &[TableDef] = &[
    TableDef::new("donors", "donors", DONOR_HEADERS, CRUD).addable(),
];
const PROGRAMMES_TABLES: &[TableDef] = &[
    TableDef::new("programmes", "programmes", PROGRAMME_HEADERS, &["Edit", "View", "Delete"]),
];
const DISBURSEMENT_TABLES: &[TableDef] = &[
    TableDef::new("disbursement", "disbursements", DISBURSEMENT_HEADERS, CRUD),
];
const BALANCE_SHEET_TABLES: &[TableDef] = &[
    TableDef::new("assets", "assets", LEDGER_HEADERS, &[]),
    TableDef::new("liabilities", "liabilities", LEDGER_HEADERS, &[]),
];
const ASSETS_TABLES: &[TableDef] = &[TableDef::new("assets", "assets", LEDGER_HEADERS, &[])];
const LIABILITIES_TABLES: &[TableDef] = &[
    TableDef::new("liabilities", "liabilities", LEDGER_HEADERS, &[]),
];
const RECEIPTS_TABLES: &[TableDef] = &[TableDef::new("receipts", "receipts", RECEIPT_HEADERS, &[])];
const EXPENSES_TABLES: &[TableDef] = &[TableDef::new("expenses", "expenses", EXPENSE_HEADERS, &[])];
const SEGREGATION_TABLES: &[TableDef] = &[
    TableDef::report("segregation", "disbursements", SEGREGATION_HEADERS),
];
const BENEFICIARY_TABLES: &[TableDef] = &[
    TableDef::report("beneficiary-domain", "users", BENEFICIARY_HEADERS),
];
const DONATION_TABLES: &[TableDef] = &[
    TableDef::report("donor-domain", "donations", DONATION_HEADERS),
];
const PROGRAMME_DOMAIN_TABLES: &[TableDef] = &[
    TableDef::new("programme-domain", "programmes", PROGRAMME_HEADERS, &["View"]),
];
const RECEIPT_REPORT_TABLES: &[TableDef] = &[
    TableDef::report("receipt-report", "receipts", RECEIPT_HEADERS),
];
const EXPENSES_REPORT_TABLES: &[TableDef] = &[
    TableDef::report("expenses-report", "expenses", EXPENSE_HEADERS),
];
const ARCHIVE_TABLES: &[TableDef] = &[
    TableDef::new("archive", "archive", ARCHIVE_HEADERS, &["Restore", "Delete"]).archive("donors"),
];
const ADMIN_TABLES: &[TableDef] = &[
    TableDef::new("admin-users-summary", "staff", STAFF_HEADERS, CRUD).addable(),
];

/// Element id of the dashboard's summary panel.
pub const DASHBOARD_STATS: &str = "dashboard-stats";

pub const PAGES: &[PageDef] = &[
    PageDef {
        path: "/dashboard",
        heading: "Dashboard",
        module: "dashboard",
        initializer: "initDashboard",
        stylesheet: true,
        layout: Layout::Dashboard,
    },
    PageDef::tables(
        "/users",
        "User Data",
        "users",
        "initUsers",
        USERS_TABLES,
    ),
    PageDef::tables(
        "/donors",
        "Donor Data",
        "donors",
        "initDonors",
        DONORS_TABLES,
    ),
    PageDef::tables(
        "/programmes",
        "Programme Data",
        "programmes",
        "initProgrammes",
        PROGRAMMES_TABLES,
    ),
    PageDef::tables(
        "/disbursement",
        "Disbursement",
        "disbursement",
        "initDisbursement",
        DISBURSEMENT_TABLES,
    ),
    PageDef::tables(
        "/finance/balance-sheet",
        "Balance Sheet",
        "finance",
        "initFinance",
        BALANCE_SHEET_TABLES,
    ),
    PageDef::tables(
        "/finance/assets",
        "Assets",
        "finance",
        "initFinance",
        ASSETS_TABLES,
    ),
    PageDef::tables(
        "/finance/liabilities",
        "Liabilities",
        "finance",
        "initFinance",
        LIABILITIES_TABLES,
    ),
    PageDef::tables(
        "/finance/receipt",
        "Receipt",
        "finance",
        "initFinance",
        RECEIPTS_TABLES,
    ),
    PageDef::tables(
        "/finance/expenses",
        "Expenses",
        "finance",
        "initFinance",
        EXPENSES_TABLES,
    ),
    PageDef::tables(
        "/reports/segregation",
        "Segregation",
        "report",
        "initReport",
        SEGREGATION_TABLES,
    ),
    PageDef::tables(
        "/reports/beneficiary-domain",
        "Beneficiary Domain",
        "report",
        "initReport",
        BENEFICIARY_TABLES,
    ),
    PageDef::tables(
        "/reports/donor-domain",
        "Donor Domain",
        "report",
        "initReport",
        DONATION_TABLES,
    ),
    PageDef::tables(
        "/reports/programme-domain",
        "Programme Domain",
        "programmes",
        "initProgrammes",
        PROGRAMME_DOMAIN_TABLES,
    ),
    PageDef::tables(
        "/reports/receipt-report",
        "Receipt Report",
        "report",
        "initReport",
        RECEIPT_REPORT_TABLES,
    ),
    PageDef::tables(
        "/reports/expenses-report",
        "Expenses Report",
        "report",
        "initReport",
        EXPENSES_REPORT_TABLES,
    ),
    PageDef::tables(
        "/archive",
        "Archive",
        "archive",
        "initArchive",
        ARCHIVE_TABLES,
    )
    .without_stylesheet(),
    PageDef::tables(
        "/admin",
        "Admin",
        "admin",
        "initAdmin",
        ADMIN_TABLES,
    ),
];

/// The page displayed at `route`.
#[must_use]
pub fn find(mount: &MountConfig, route: &str) -> Option<&'static PageDef> {
    let relative = mount.relative(route);
    PAGES.iter().find(|page| page.path == relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_paths_are_unique() {
        let paths: HashSet<_> = PAGES.iter().map(|p| p.path).collect();
        assert_eq!(paths.len(), PAGES.len());
    }

    #[test]
    fn test_find_strips_mount() {
        let mount = MountConfig::new("/admin-panel");
        let page = find(&mount, "/admin-panel/finance/receipt").unwrap();
        assert_eq!(page.module, "finance");
        assert_eq!(page.table_defs()[0].key, "receipts");
        assert!(find(&mount, "/admin-panel/nowhere").is_none());
    }

    #[test]
    fn test_template_names_containers() {
        let page = find(&MountConfig::default(), "/ehi/admin").unwrap();
        let html = page.template();
        for id in [
            "page-title",
            "admin-users-summary-search",
            "admin-users-summary-add",
            "admin-users-summary-table",
            "admin-users-summary-pager",
        ] {
            assert!(html.contains(&format!("id=\"{id}\"")), "{id} missing");
        }
    }

    #[test]
    fn test_reports_have_no_actions_or_search() {
        for page in PAGES.iter().filter(|p| p.module == "report") {
            for table in page.table_defs() {
                assert!(table.actions.is_empty());
                assert!(!page.template().contains(&table.search_id()));
            }
        }
    }

    #[test]
    fn test_archive_has_select_column_and_no_stylesheet() {
        let page = find(&MountConfig::default(), "/ehi/archive").unwrap();
        assert!(!page.stylesheet);
        let table = page.table_defs()[0];
        assert!(table.select);
        assert_eq!(table.restore_to, Some("donors"));
    }
}
