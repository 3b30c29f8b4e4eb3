mod calorie;
pub(crate) mod helpers;
mod user;

pub(crate) use calorie::{cmd_calorie_add, cmd_calorie_delete, cmd_calorie_list, cmd_calorie_show};
pub(crate) use user::{cmd_register, cmd_user_delete, cmd_user_show, cmd_user_update};
