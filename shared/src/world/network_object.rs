use crate::{
    authority::{contested::ContestedSync, owner_driven::OwnerDrivenSync},
    types::ObjectId,
    world::error::ObjectError,
};

/// How authority over an object is decided.
#[derive(Clone, Debug)]
pub enum ObjectModel {
    OwnerDriven(OwnerDrivenSync),
    Contested(ContestedSync),
}

/// A live shared entity. The application holds the strong handle; the
/// object registry only refers to it.
#[derive(Clone, Debug)]
pub struct NetworkObject {
    id: ObjectId,
    model: ObjectModel,
}

impl NetworkObject {
    pub fn owner_driven(id: ObjectId, sync: OwnerDrivenSync) -> Self {
        Self {
            id,
            model: ObjectModel::OwnerDriven(sync),
        }
    }

    pub fn contested(id: ObjectId, sync: ContestedSync) -> Self {
        Self {
            id,
            model: ObjectModel::Contested(sync),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn model(&self) -> &ObjectModel {
        &self.model
    }

    pub fn is_contested(&self) -> bool {
        matches!(self.model, ObjectModel::Contested(_))
    }

    pub fn owner_driven_mut(&mut self) -> Result<&mut OwnerDrivenSync, ObjectError> {
        match &mut self.model {
            ObjectModel::OwnerDriven(sync) => Ok(sync),
            ObjectModel::Contested(_) => Err(ObjectError::WrongModel {
                id: self.id,
                expected: "owner-driven",
            }),
        }
    }

    pub fn contested_mut(&mut self) -> Result<&mut ContestedSync, ObjectError> {
        match &mut self.model {
            ObjectModel::Contested(sync) => Ok(sync),
            ObjectModel::OwnerDriven(_) => Err(ObjectError::WrongModel {
                id: self.id,
                expected: "contested",
            }),
        }
    }
}
