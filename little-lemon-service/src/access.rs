//! Who may run which operation.
//!
//! Every operation the service exposes is listed in [`Operation`] and mapped
//! to the [`Access`] level it requires. Request handlers resolve the caller
//! once and ask the table, instead of picking permission rules per verb.

use uuid::Uuid;

use crate::{
    error::ServiceError,
    models::{Order, Role, User},
};

/// An authenticated user together with the groups they belong to.
#[derive(Clone, Debug, PartialEq)]
pub struct Caller {
    pub user: User,
    pub roles: Vec<Role>,
}

impl Caller {
    pub fn new(user: User, roles: Vec<Role>) -> Self {
        Self { user, roles }
    }

    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Managers and administrators.
    pub fn is_elevated(&self) -> bool {
        self.user.is_staff || self.user.is_superuser
    }

    pub fn is_delivery_crew(&self) -> bool {
        self.has_role(Role::DeliveryCrew)
    }

    /// Whether `order` falls inside the caller's order scope.
    pub fn can_see(&self, order: &Order) -> bool {
        match self.order_scope() {
            OrderScope::All => true,
            OrderScope::AssignedTo(crew) => order.delivery_crew_id == Some(crew),
            OrderScope::PlacedBy(user) => order.user_id == user,
        }
    }

    pub fn order_scope(&self) -> OrderScope {
        if self.is_elevated() {
            OrderScope::All
        } else if self.is_delivery_crew() {
            OrderScope::AssignedTo(self.id())
        } else {
            OrderScope::PlacedBy(self.id())
        }
    }
}

/// Which orders a caller is allowed to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderScope {
    All,
    AssignedTo(Uuid),
    PlacedBy(Uuid),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Elevated,
    ElevatedOrDeliveryCrew,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    ListCategories,
    GetCategory,
    CreateCategory,
    UpdateCategory,
    DeleteCategory,
    ListMenuItems,
    GetMenuItem,
    CreateMenuItem,
    UpdateMenuItem,
    DeleteMenuItem,
    ListCart,
    AddToCart,
    UpdateCartLine,
    RemoveCartLine,
    ClearCart,
    ListOrders,
    GetOrder,
    PlaceOrder,
    AssignDeliveryCrew,
    UpdateOrderStatus,
    DeleteOrder,
    ListGroupMembers,
    AssignToGroup,
    RemoveFromGroup,
}

impl Operation {
    pub fn access(self) -> Access {
        use Operation::*;

        match self {
            ListMenuItems | GetMenuItem => Access::Public,
            ListCart | AddToCart | UpdateCartLine | RemoveCartLine | ClearCart | ListOrders
            | GetOrder | PlaceOrder => Access::Authenticated,
            UpdateOrderStatus => Access::ElevatedOrDeliveryCrew,
            ListCategories | GetCategory | CreateCategory | UpdateCategory | DeleteCategory
            | CreateMenuItem | UpdateMenuItem | DeleteMenuItem | AssignDeliveryCrew
            | DeleteOrder | ListGroupMembers | AssignToGroup | RemoveFromGroup => {
                Access::Elevated
            }
        }
    }

    pub fn permits(self, caller: &Caller) -> bool {
        match self.access() {
            Access::Public | Access::Authenticated => true,
            Access::Elevated => caller.is_elevated(),
            Access::ElevatedOrDeliveryCrew => caller.is_elevated() || caller.is_delivery_crew(),
        }
    }

    pub fn authorize(self, caller: &Caller) -> Result<(), ServiceError> {
        if self.permits(caller) {
            Ok(())
        } else {
            tracing::debug!(operation = ?self, user = %caller.user.username, "permission denied");
            Err(ServiceError::PermissionDenied)
        }
    }
}

/// Shape in which an order is presented to a caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderView {
    /// Raw `status` and `delivery_crew` plus the derived label.
    Full,
    /// Derived label only.
    Summary,
}

impl OrderView {
    pub fn for_caller(caller: &Caller) -> Self {
        if caller.is_elevated() {
            OrderView::Full
        } else {
            OrderView::Summary
        }
    }
}
