pub mod list;
pub mod todo;
pub mod user;

pub use list::{List, ListUpdate, ListWithTodos, NewList};
pub use todo::{NewTodo, Todo, TodoUpdate};
pub use user::Key;
