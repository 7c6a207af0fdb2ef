//! `User.mail_address` becomes `User.email`.

use crate::migration::driver::{StepContext, StepDriver, StepFuture};

const USER_TABLE: &str = "User";

pub struct UserEmail {
    ctx: StepContext,
}

impl UserEmail {
    pub fn new(ctx: StepContext) -> Self {
        Self { ctx }
    }
}

impl StepDriver for UserEmail {
    fn context(&self) -> &StepContext {
        &self.ctx
    }

    fn context_mut(&mut self) -> &mut StepContext {
        &mut self.ctx
    }

    fn migrate_table<'a>(&'a mut self, table: &'a str) -> StepFuture<'a, ()> {
        Box::pin(async move {
            if table == USER_TABLE {
                self.ctx
                    .carry_over_with(table, |row| {
                        if let Some(mail) = row.remove("mail_address") {
                            row.insert("email".into(), mail);
                        }
                    })
                    .await?;
            } else {
                self.ctx.carry_over(table).await?;
            }
            Ok(())
        })
    }
}
