//! The application's own schema history.
//!
//! | version | change                                                    |
//! |---------|-----------------------------------------------------------|
//! | 38      | oldest layout still migratable                            |
//! | 39      | `User.language`                                           |
//! | 40      | `Node.threshold`                                          |
//! | 41      | multi-tenancy: `Tenant`, `tid` columns, `Node` folded into `Config` |
//! | 42      | `User.two_factor_enable`                                  |
//! | 43      | `Context.presentation_order`                              |
//! | 44      | `SubmissionStatus`, `InternalTip.status`/`substatus`      |
//! | 45      | `User.mail_address` renamed to `User.email`               |

pub mod current;
pub mod history;

use crate::error::SchemaError;
use crate::schema::SchemaRegistry;

pub use current::current_schema;

pub const FIRST_SUPPORTED_VERSION: u32 = 38;
pub const CURRENT_VERSION: u32 = 45;

/// Table and column holding the natural languages enabled per tenant.
pub const ENABLED_LANGUAGE_TABLE: &str = "EnabledLanguage";
pub const ENABLED_LANGUAGE_COLUMN: &str = "name";
pub const TENANT_TABLE: &str = "Tenant";

/// Build the registry for the bundled history.
pub fn registry() -> Result<SchemaRegistry, SchemaError> {
    SchemaRegistry::builder(FIRST_SUPPORTED_VERSION, CURRENT_VERSION)
        .history("Tenant")
        .absent(38, 41)
        .define(41, current::tenant())
        .done()?
        .history("Node")
        .define(38, history::node_v38())
        .define(40, history::node_v40())
        .remove(41)
        .done()?
        .history("Config")
        .define(38, history::config_v38())
        .define(41, current::config())
        .done()?
        .history("ConfigL10N")
        .define(38, history::config_l10n_v38())
        .define(41, current::config_l10n())
        .done()?
        .history("EnabledLanguage")
        .define(38, history::enabled_language_v38())
        .define(41, current::enabled_language())
        .done()?
        .history("User")
        .define(38, history::user_v38())
        .define(39, history::user_v39())
        .define(41, history::user_v41())
        .define(42, history::user_v42())
        .define(45, current::user())
        .done()?
        .history("Context")
        .define(38, history::context_v38())
        .define(41, history::context_v41())
        .define(43, current::context())
        .done()?
        .history("InternalTip")
        .define(38, history::internal_tip_v38())
        .define(41, history::internal_tip_v41())
        .define(44, current::internal_tip())
        .done()?
        .history("SubmissionStatus")
        .absent(38, 44)
        .define(44, current::submission_status())
        .done()?
        .current(current_schema())
        .build()
}
